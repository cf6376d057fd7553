//! Minimal Gemini client for our use-cases.
//!
//! We only call `models/{model}:generateContent` with a single user turn and read
//! back the concatenated text parts. Sampling parameters and the four safety
//! settings are fixed per client. Calls are instrumented and log model names,
//! latencies and response sizes (not contents).
//!
//! NOTE: We never log the API key; it travels in the `x-goog-api-key` header.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::config::GenerationSettings;
use crate::credentials::KeyStore;
use crate::error::PipelineError;

/// Seam between the generators and the generative-AI provider.
#[async_trait]
pub trait TextGenerator: Send + Sync {
  /// Whether a usable credential is present. Checked before any network call.
  fn is_configured(&self) -> bool;

  /// One prompt in, raw model text out.
  async fn generate(&self, prompt: &str) -> Result<String, PipelineError>;
}

/// One generation bounded by `limit`; an elapsed deadline becomes `PipelineError::Timeout`.
pub async fn generate_within(ai: &dyn TextGenerator, prompt: &str, limit: Duration) -> Result<String, PipelineError> {
  if !ai.is_configured() {
    return Err(PipelineError::NotConfigured);
  }
  tokio::time::timeout(limit, ai.generate(prompt))
    .await
    .map_err(|_| PipelineError::Timeout(limit))?
}

const HARM_CATEGORIES: [&str; 4] = [
  "HARM_CATEGORY_HARASSMENT",
  "HARM_CATEGORY_HATE_SPEECH",
  "HARM_CATEGORY_SEXUALLY_EXPLICIT",
  "HARM_CATEGORY_DANGEROUS_CONTENT",
];
const BLOCK_THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";

#[derive(Clone)]
pub struct GeminiClient {
  pub client: reqwest::Client,
  pub base_url: String,
  pub model: String,
  keys: Arc<KeyStore>,
  generation_config: GenerationConfig,
}

impl GeminiClient {
  pub fn new(
    base_url: impl Into<String>,
    model: impl Into<String>,
    keys: Arc<KeyStore>,
    settings: &GenerationSettings,
  ) -> Result<Self, PipelineError> {
    let client = reqwest::Client::builder()
      .timeout(settings.timeout() + Duration::from_secs(5))
      .build()
      .map_err(|e| PipelineError::provider("gemini", e.to_string()))?;
    Ok(Self {
      client,
      base_url: base_url.into().trim_end_matches('/').to_string(),
      model: model.into(),
      keys,
      generation_config: GenerationConfig {
        temperature: settings.temperature,
        top_k: settings.top_k,
        top_p: settings.top_p,
        max_output_tokens: settings.max_output_tokens,
      },
    })
  }

  fn request_body(&self, prompt: &str) -> GenerateContentRequest {
    GenerateContentRequest {
      contents: vec![Content { role: "user".into(), parts: vec![Part { text: prompt.to_string() }] }],
      generation_config: self.generation_config.clone(),
      safety_settings: HARM_CATEGORIES
        .iter()
        .map(|c| SafetySetting { category: (*c).into(), threshold: BLOCK_THRESHOLD.into() })
        .collect(),
    }
  }
}

#[async_trait]
impl TextGenerator for GeminiClient {
  fn is_configured(&self) -> bool {
    self.keys.is_configured()
  }

  #[instrument(level = "info", skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
  async fn generate(&self, prompt: &str) -> Result<String, PipelineError> {
    let api_key = match self.keys.get() {
      Some(k) if KeyStore::is_valid_key(&k) => k,
      _ => return Err(PipelineError::NotConfigured),
    };

    let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
    let start = Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, "edai-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header("x-goog-api-key", api_key)
      .json(&self.request_body(prompt))
      .send().await
      .map_err(|e| PipelineError::provider("gemini", e.to_string()))?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_gemini_error(&body).unwrap_or(body);
      error!(?status, elapsed = ?start.elapsed(), "Gemini call failed");
      return Err(PipelineError::provider("gemini", format!("HTTP {}: {}", status, msg)));
    }

    let body: GenerateContentResponse = res.json().await.map_err(|e| PipelineError::Decode(e.to_string()))?;
    if let Some(usage) = &body.usage_metadata {
      info!(prompt_tokens = ?usage.prompt_token_count, candidates_tokens = ?usage.candidates_token_count, total_tokens = ?usage.total_token_count, "Gemini usage");
    }

    let text = body.text();
    if text.trim().is_empty() {
      if let Some(reason) = body.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(PipelineError::provider("gemini", format!("prompt blocked: {}", reason)));
      }
      return Err(PipelineError::Decode("Empty response from Gemini".into()));
    }
    info!(elapsed = ?start.elapsed(), response_len = text.len(), "Gemini response received");
    Ok(text)
  }
}

// --- generateContent DTOs ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
  contents: Vec<Content>,
  generation_config: GenerationConfig,
  safety_settings: Vec<SafetySetting>,
}

#[derive(Serialize, Deserialize, Default)]
struct Content {
  #[serde(default)] role: String,
  #[serde(default)] parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
  #[serde(default)] text: String,
}

#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
  temperature: f32,
  top_k: u32,
  top_p: f32,
  max_output_tokens: u32,
}

#[derive(Serialize)]
struct SafetySetting {
  category: String,
  threshold: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
  #[serde(default)] candidates: Vec<Candidate>,
  #[serde(default)] prompt_feedback: Option<PromptFeedback>,
  #[serde(default)] usage_metadata: Option<UsageMetadata>,
}

impl GenerateContentResponse {
  fn text(&self) -> String {
    self.candidates.first()
      .and_then(|c| c.content.as_ref())
      .map(|c| c.parts.iter().map(|p| p.text.as_str()).collect::<String>())
      .unwrap_or_default()
  }
}

#[derive(Deserialize)]
struct Candidate {
  #[serde(default)] content: Option<Content>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
  #[serde(default)] block_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
  #[serde(default)] prompt_token_count: Option<u32>,
  #[serde(default)] candidates_token_count: Option<u32>,
  #[serde(default)] total_token_count: Option<u32>,
}

/// Try to extract a clean error message from a Google API error body.
fn extract_gemini_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
