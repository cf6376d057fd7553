//! Loading agent configuration (prompt templates + generation tuning) from TOML.
//!
//! See `AgentConfig`, `Prompts`, `GenerationSettings` and `SessionSettings` for the expected schema.
//! Every section is optional; missing keys fall back to the defaults below.

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info};

use crate::retry::RetryPolicy;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AgentConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub generation: GenerationSettings,
  #[serde(default)]
  pub sessions: SessionSettings,
}

/// Prompt templates sent to Gemini. Placeholders are `{name}` style (see `util::fill_template`).
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  /// Vars: place_name, category, location
  pub place_info_template: String,
  /// Vars: place_name, category, difficulty, count, context_block
  pub quiz_template: String,
  /// Vars: context. Rendered into `{context_block}` when extra context exists.
  pub quiz_context_template: String,
  /// Vars: place_name, description
  pub enhance_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      place_info_template: r#"Generate comprehensive information about "{place_name}" in {location}.

Please provide the response in the following JSON format:
{
    "name": "{place_name}",
    "description": "Detailed description (200-300 words)",
    "historicalSignificance": "Historical context and significance (100-150 words)",
    "interestingFacts": ["fact1", "fact2", "fact3", "fact4", "fact5"],
    "bestTimeToVisit": "Best time to visit with reasons",
    "nearbyAttractions": ["attraction1", "attraction2", "attraction3"]
}

Focus on:
- Accurate historical information
- Cultural significance
- Architecture and unique features
- Local stories and legends
- Practical visitor information

Category: {category}
Make sure all information is factual and well-researched. Respond ONLY with the JSON object."#.into(),
      quiz_template: r#"Generate {count} {difficulty} level quiz questions about "{place_name}".
{context_block}
Please provide the response in the following JSON format:
{
    "questions": [
        {
            "question": "Question text",
            "options": ["option1", "option2", "option3", "option4"],
            "correctAnswerIndex": 0,
            "explanation": "Explanation for the correct answer",
            "difficulty": "{difficulty}"
        }
    ],
    "totalQuestions": {count},
    "category": "{category}",
    "placeName": "{place_name}"
}

Requirements:
- Each question must have exactly 4 options
- correctAnswerIndex is 0-based (0, 1, 2, or 3)
- Include detailed explanations
- Mix historical, architectural, cultural and geographical questions
- Ensure questions are factually accurate
- Difficulty level: {difficulty}
Respond ONLY with the JSON object."#.into(),
      quiz_context_template: "Use this additional context: {context}\n".into(),
      enhance_template: r#"Enhance and expand the following description of "{place_name}" with more engaging content:

Current description: "{description}"

Please provide an enhanced version that:
- Makes it more engaging and interesting
- Adds cultural context
- Includes lesser-known facts
- Maintains accuracy
- Keeps it within 400-500 words

Return only the enhanced description text, no JSON format needed."#.into(),
    }
  }
}

/// Sampling, timeout and retry knobs for every Gemini call.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
  pub timeout_secs: u64,
  pub max_attempts: u32,
  pub retry_delay_ms: u64,
  pub temperature: f32,
  pub top_k: u32,
  pub top_p: f32,
  pub max_output_tokens: u32,
  pub default_question_count: usize,
}

impl Default for GenerationSettings {
  fn default() -> Self {
    Self {
      timeout_secs: 30,
      max_attempts: 3,
      retry_delay_ms: 2000,
      temperature: 0.7,
      top_k: 40,
      top_p: 0.95,
      max_output_tokens: 2048,
      default_question_count: 5,
    }
  }
}

impl GenerationSettings {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }

  pub fn retry_policy(&self) -> RetryPolicy {
    RetryPolicy::new(self.max_attempts, Duration::from_millis(self.retry_delay_ms))
  }
}

/// Quiz session lifetime. Sessions untouched for `idle_ttl_secs` are evicted
/// by a sweep that runs every `sweep_interval_secs`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
  pub idle_ttl_secs: u64,
  pub sweep_interval_secs: u64,
}

impl Default for SessionSettings {
  fn default() -> Self {
    Self { idle_ttl_secs: 3600, sweep_interval_secs: 300 }
  }
}

impl SessionSettings {
  pub fn idle_ttl(&self) -> Duration {
    Duration::from_secs(self.idle_ttl_secs)
  }

  pub fn sweep_interval(&self) -> Duration {
    // A zero interval would make `tokio::time::interval` panic.
    Duration::from_secs(self.sweep_interval_secs.max(1))
  }
}

/// Endpoints of the external collaborators, read from env with public defaults.
#[derive(Clone, Debug)]
pub struct ServiceUrls {
  pub gemini_base_url: String,
  pub gemini_model: String,
  pub nominatim_base_url: String,
  pub wikipedia_base_url: String,
}

impl ServiceUrls {
  pub fn from_env() -> Self {
    let var = |k: &str, d: &str| std::env::var(k).unwrap_or_else(|_| d.to_string());
    Self {
      gemini_base_url: var("GEMINI_BASE_URL", "https://generativelanguage.googleapis.com/v1beta"),
      gemini_model: var("GEMINI_MODEL", "gemini-1.5-flash"),
      nominatim_base_url: var("NOMINATIM_BASE_URL", "https://nominatim.openstreetmap.org"),
      wikipedia_base_url: var("WIKIPEDIA_BASE_URL", "https://en.wikipedia.org/api/rest_v1"),
    }
  }
}

/// Attempt to load `AgentConfig` from AGENT_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_agent_config_from_env() -> Option<AgentConfig> {
  let path = std::env::var("AGENT_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AgentConfig>(&s) {
      Ok(cfg) => {
        info!(target: "edai_backend", %path, "Loaded agent config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "edai_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "edai_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
