//! Wikipedia REST page summaries, with a canned fallback.
//!
//! `summary` never fails; lookups that go wrong are logged and replaced by a
//! short built-in description.

use std::time::Duration;

use reqwest::header::USER_AGENT;
use serde::Deserialize;
use tracing::{instrument, warn};

use crate::domain::PlaceSummary;
use crate::error::PipelineError;

const APP_USER_AGENT: &str = "EdaiBackend/0.1 (Educational Travel App)";

#[derive(Clone)]
pub struct WikipediaClient {
  client: reqwest::Client,
  base_url: String,
}

#[derive(Deserialize)]
struct SummaryBody {
  title: String,
  #[serde(default)] extract: Option<String>,
  #[serde(default)] description: Option<String>,
  #[serde(default)] thumbnail: Option<Image>,
  #[serde(default)] originalimage: Option<Image>,
  #[serde(default)] content_urls: Option<ContentUrls>,
}

#[derive(Deserialize)]
struct Image { source: String }

#[derive(Deserialize)]
struct ContentUrls { desktop: Option<PageUrl> }

#[derive(Deserialize)]
struct PageUrl { page: Option<String> }

/// "Shaniwar Wada, Pune" -> "Shaniwar_Wada"
pub fn article_title(place_name: &str) -> String {
  place_name.split(',').next().unwrap_or("").trim().replace(' ', "_")
}

impl WikipediaClient {
  pub fn new(base_url: impl Into<String>) -> Result<Self, PipelineError> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(15))
      .build()
      .map_err(|e| PipelineError::provider("wikipedia", e.to_string()))?;
    Ok(Self { client, base_url: base_url.into().trim_end_matches('/').to_string() })
  }

  #[instrument(level = "info", skip(self))]
  pub async fn summary(&self, place_name: &str) -> PlaceSummary {
    match self.fetch(place_name).await {
      Ok(s) => s,
      Err(e) => {
        warn!(target: "place", error = %e, "Wikipedia lookup failed; using canned summary");
        canned_summary(place_name)
      }
    }
  }

  async fn fetch(&self, place_name: &str) -> Result<PlaceSummary, PipelineError> {
    let title = article_title(place_name);
    if title.is_empty() {
      return Err(PipelineError::Validation("empty title".into()));
    }
    let mut url = reqwest::Url::parse(&self.base_url).map_err(|e| PipelineError::provider("wikipedia", e.to_string()))?;
    url.path_segments_mut()
      .map_err(|_| PipelineError::provider("wikipedia", "base url cannot hold a path"))?
      .extend(["page", "summary", title.as_str()]);

    let res = self.client.get(url)
      .header(USER_AGENT, APP_USER_AGENT)
      .send().await
      .map_err(|e| PipelineError::provider("wikipedia", e.to_string()))?;
    if !res.status().is_success() {
      return Err(PipelineError::provider("wikipedia", format!("HTTP {}", res.status())));
    }
    let body: SummaryBody = res.json().await.map_err(|e| PipelineError::Decode(e.to_string()))?;
    Ok(PlaceSummary {
      title: body.title,
      description: body.extract.or(body.description).unwrap_or_else(|| "No description available".into()),
      image_url: body.thumbnail.or(body.originalimage).map(|i| i.source),
      page_url: body.content_urls.and_then(|c| c.desktop).and_then(|d| d.page),
    })
  }
}

pub fn canned_summary(place_name: &str) -> PlaceSummary {
  let lower = place_name.to_lowercase();
  let (title, description) = if lower.contains("pune") {
    ("Pune", "Pune is a large city in the western Indian state of Maharashtra. It was the seat of the Peshwas, prime ministers of the Maratha Empire, until 1818. Landmarks include the Aga Khan Palace, a memorial to Mahatma Gandhi, and the 8th-century Pataleshwar cave temple dedicated to Shiva.")
  } else if lower.contains("mumbai") {
    ("Mumbai", "Mumbai is the capital of Maharashtra and the most populous city in India. It is the country's financial and commercial centre and the home of the Hindi film industry.")
  } else if lower.contains("delhi") {
    ("Delhi", "Delhi is the National Capital Territory of India and contains New Delhi, the national capital. It is bordered by Haryana and Uttar Pradesh and is known for centuries of layered history and architecture.")
  } else {
    ("", "An interesting place with its own history and culture. Explore it to discover the stories that make it unique.")
  };
  PlaceSummary {
    title: if title.is_empty() { place_name.to_string() } else { title.to_string() },
    description: description.to_string(),
    image_url: None,
    page_url: None,
  }
}
