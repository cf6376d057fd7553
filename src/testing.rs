//! Test doubles shared across module tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::PipelineError;
use crate::gemini::TextGenerator;
use crate::geocoding::{GeocodeMatch, Geocoder};

/// Replays canned replies in order and records every prompt it was sent.
pub struct ScriptedAi {
  configured: bool,
  stall_first: usize,
  replies: Mutex<Vec<Result<String, PipelineError>>>,
  prompts: Mutex<Vec<String>>,
}

impl ScriptedAi {
  pub fn new(replies: Vec<Result<String, PipelineError>>) -> Arc<Self> {
    Arc::new(Self { configured: true, stall_first: 0, replies: Mutex::new(replies), prompts: Mutex::new(vec![]) })
  }

  pub fn unconfigured() -> Arc<Self> {
    Arc::new(Self { configured: false, stall_first: 0, replies: Mutex::new(vec![]), prompts: Mutex::new(vec![]) })
  }

  /// The first `n` calls never answer (for timeout tests under paused time).
  pub fn stalling(n: usize, replies: Vec<Result<String, PipelineError>>) -> Arc<Self> {
    Arc::new(Self { configured: true, stall_first: n, replies: Mutex::new(replies), prompts: Mutex::new(vec![]) })
  }

  pub fn calls(&self) -> usize {
    self.prompts.lock().unwrap().len()
  }

  pub fn prompt(&self, i: usize) -> String {
    self.prompts.lock().unwrap()[i].clone()
  }
}

#[async_trait]
impl TextGenerator for ScriptedAi {
  fn is_configured(&self) -> bool {
    self.configured
  }

  async fn generate(&self, prompt: &str) -> Result<String, PipelineError> {
    let call = {
      let mut prompts = self.prompts.lock().unwrap();
      prompts.push(prompt.to_string());
      prompts.len()
    };
    if call <= self.stall_first {
      tokio::time::sleep(Duration::from_secs(3600)).await;
    }
    let mut replies = self.replies.lock().unwrap();
    if replies.is_empty() {
      Err(PipelineError::provider("gemini", "no scripted reply"))
    } else {
      replies.remove(0)
    }
  }
}

/// Geocoder with fixed answers.
pub struct StaticGeocoder {
  pub reverse: Result<GeocodeMatch, PipelineError>,
  pub search: Result<Vec<GeocodeMatch>, PipelineError>,
}

impl StaticGeocoder {
  pub fn failing() -> Arc<Self> {
    Arc::new(Self {
      reverse: Err(PipelineError::provider("nominatim", "connection refused")),
      search: Err(PipelineError::provider("nominatim", "connection refused")),
    })
  }
}

#[async_trait]
impl Geocoder for StaticGeocoder {
  async fn reverse(&self, _lat: f64, _lon: f64) -> Result<GeocodeMatch, PipelineError> {
    self.reverse.clone()
  }

  async fn search(&self, _query: &str) -> Result<Vec<GeocodeMatch>, PipelineError> {
    self.search.clone()
  }
}
