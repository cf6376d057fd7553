//! Descriptive place content via Gemini.
//!
//! The model is asked for a JSON object; if what comes back does not decode we
//! still show the text, wrapped in a degraded `PlaceContent`.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::classify::Category;
use crate::config::{GenerationSettings, Prompts};
use crate::domain::PlaceContent;
use crate::error::PipelineError;
use crate::gemini::{generate_within, TextGenerator};
use crate::retry::RetryPolicy;
use crate::util::{fill_template, strip_code_fences, trunc_for_log};

const NO_HISTORY: &str = "Historical information not available in structured format";
const FACTS_IN_DESCRIPTION: &str = "Generated content available in description";
const VISIT_IN_DESCRIPTION: &str = "Information available in description";

#[derive(Clone)]
pub struct ContentGenerator {
  ai: Arc<dyn TextGenerator>,
  prompts: Arc<Prompts>,
  timeout: Duration,
  retry: RetryPolicy,
}

impl ContentGenerator {
  pub fn new(ai: Arc<dyn TextGenerator>, prompts: Arc<Prompts>, settings: &GenerationSettings) -> Self {
    Self { ai, prompts, timeout: settings.timeout(), retry: settings.retry_policy() }
  }

  pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
    self.retry = retry;
    self
  }

  /// Single attempt. Decode failures degrade; configuration, timeout and provider failures are errors.
  #[instrument(level = "info", skip(self, location_context), fields(place_len = place_name.len()))]
  pub async fn generate(&self, place_name: &str, category: Category, location_context: &str) -> Result<PlaceContent, PipelineError> {
    let prompt = fill_template(&self.prompts.place_info_template, &[
      ("place_name", place_name),
      ("category", category.as_str()),
      ("location", location_context),
    ]);
    let raw = generate_within(self.ai.as_ref(), &prompt, self.timeout).await?;
    debug!(target: "place", raw = %trunc_for_log(&raw, 300), "Content response");
    Ok(parse_content(&raw))
  }

  pub async fn generate_with_retry(&self, place_name: &str, category: Category, location_context: &str) -> Result<PlaceContent, PipelineError> {
    let out = self.retry
      .run("place content", move |_| self.generate(place_name, category, location_context))
      .await?;
    info!(target: "place", %place_name, facts = out.interesting_facts.len(), "Place content ready");
    Ok(out)
  }

  /// Rewrites an existing description into a longer plain-text one.
  #[instrument(level = "info", skip(self, existing), fields(existing_len = existing.len()))]
  pub async fn enhance_description(&self, place_name: &str, existing: &str) -> Result<String, PipelineError> {
    let prompt = fill_template(&self.prompts.enhance_template, &[
      ("place_name", place_name),
      ("description", existing),
    ]);
    let prompt = prompt.as_str();
    let out = self.retry
      .run("enhance description", move |_| generate_within(self.ai.as_ref(), prompt, self.timeout))
      .await?;
    Ok(out.trim().to_string())
  }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawContent {
  description: String,
  #[serde(default)] historical_significance: String,
  #[serde(default)] interesting_facts: Vec<String>,
  #[serde(default)] best_time_to_visit: String,
  #[serde(default)] nearby_attractions: Vec<String>,
}

/// Strict decode, or the raw text as description with placeholder fields.
pub fn parse_content(raw: &str) -> PlaceContent {
  let cleaned = strip_code_fences(raw);
  match serde_json::from_str::<RawContent>(&cleaned) {
    Ok(c) => PlaceContent {
      description: c.description,
      historical_significance: c.historical_significance,
      interesting_facts: c.interesting_facts,
      best_time_to_visit: c.best_time_to_visit,
      nearby_attractions: c.nearby_attractions,
    },
    Err(e) => {
      warn!(target: "place", error = %e, "Content was not valid JSON; using degraded content");
      PlaceContent {
        description: cleaned,
        historical_significance: NO_HISTORY.into(),
        interesting_facts: vec![FACTS_IN_DESCRIPTION.into()],
        best_time_to_visit: VISIT_IN_DESCRIPTION.into(),
        nearby_attractions: Vec::new(),
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::ScriptedAi;

  fn generator(ai: Arc<ScriptedAi>) -> ContentGenerator {
    ContentGenerator::new(ai, Arc::new(Prompts::default()), &GenerationSettings::default())
      .with_retry(RetryPolicy::new(3, Duration::ZERO))
  }

  const GOOD: &str = r#"```json
{"name":"Shaniwar Wada","description":"Fortified palace.","historicalSignificance":"Seat of the Peshwas.",
 "interestingFacts":["Built in 1732"],"bestTimeToVisit":"Winter","nearbyAttractions":["Lal Mahal"]}
```"#;

  #[tokio::test]
  async fn decodes_fenced_json() {
    let ai = ScriptedAi::new(vec![Ok(GOOD.into())]);
    let c = generator(ai.clone()).generate("Shaniwar Wada", Category::TouristPlace, "Pune, India").await.unwrap();
    assert_eq!(c.historical_significance, "Seat of the Peshwas.");
    assert_eq!(c.nearby_attractions, vec!["Lal Mahal"]);
    let prompt = ai.prompt(0);
    assert!(prompt.contains("\"Shaniwar Wada\" in Pune, India"));
    assert!(prompt.contains("Category: Tourist Place"));
  }

  #[tokio::test]
  async fn undecodable_text_degrades_instead_of_failing() {
    let ai = ScriptedAi::new(vec![Ok("Shaniwar Wada is a fortification.".into())]);
    let c = generator(ai).generate("Shaniwar Wada", Category::TouristPlace, "Pune").await.unwrap();
    assert_eq!(c.description, "Shaniwar Wada is a fortification.");
    assert_eq!(c.historical_significance, NO_HISTORY);
    assert_eq!(c.interesting_facts, vec![FACTS_IN_DESCRIPTION.to_string()]);
    assert!(c.nearby_attractions.is_empty());
  }

  #[tokio::test]
  async fn unconfigured_fails_before_any_call() {
    let ai = ScriptedAi::unconfigured();
    let err = generator(ai.clone()).generate_with_retry("X", Category::Location, "Y").await.unwrap_err();
    assert_eq!(err, PipelineError::NotConfigured);
    assert_eq!(ai.calls(), 0);
  }

  #[tokio::test]
  async fn provider_failures_are_retried() {
    let ai = ScriptedAi::new(vec![Err(PipelineError::provider("gemini", "HTTP 503")), Ok(GOOD.into())]);
    let c = generator(ai.clone()).generate_with_retry("Shaniwar Wada", Category::TouristPlace, "Pune").await.unwrap();
    assert_eq!(c.description, "Fortified palace.");
    assert_eq!(ai.calls(), 2);
  }

  #[tokio::test]
  async fn enhance_returns_trimmed_plain_text() {
    let ai = ScriptedAi::new(vec![Ok("  A longer story.\n".into())]);
    let out = generator(ai.clone()).enhance_description("Aga Khan Palace", "A palace.").await.unwrap();
    assert_eq!(out, "A longer story.");
    assert!(ai.prompt(0).contains("Current description: \"A palace.\""));
  }
}
