//! Error taxonomy for the place/quiz pipeline and for quiz sessions.
//!
//! Provider failures are normalized into `PipelineError` before they reach the
//! session/state layer. Handlers work with `AppError`, which wraps both.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PipelineError {
  /// Gemini credential missing or malformed. Never retried.
  #[error("Gemini AI not configured. Please add your API key in Settings.")]
  NotConfigured,

  #[error("request timed out after {0:?}")]
  Timeout(Duration),

  /// Transport or HTTP-level failure of an external provider.
  #[error("{provider} request failed: {message}")]
  Provider { provider: &'static str, message: String },

  /// Response could not be decoded into the expected structure.
  #[error("failed to parse response: {0}")]
  Decode(String),

  /// Response decoded but violated a structural invariant (quiz shape).
  #[error("invalid response: {0}")]
  Validation(String),

  #[error("location unavailable: {0}")]
  LocationUnavailable(String),
}

impl PipelineError {
  pub fn provider(provider: &'static str, message: impl Into<String>) -> Self {
    PipelineError::Provider { provider, message: message.into() }
  }

  /// Configuration errors short-circuit; everything else is transient.
  pub fn is_retryable(&self) -> bool {
    !matches!(self, PipelineError::NotConfigured)
  }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
  #[error("unknown quiz session: {0}")]
  NotFound(String),

  #[error("operation '{op}' not allowed while quiz is {state}")]
  InvalidState { op: &'static str, state: &'static str },

  #[error("quiz has no questions")]
  NoQuestions,

  #[error("quiz session id already in use: {0}")]
  Duplicate(String),
}

/// What a handler can fail with; both transports render it as a message.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AppError {
  #[error(transparent)]
  Pipeline(#[from] PipelineError),

  #[error(transparent)]
  Session(#[from] SessionError),

  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  BadRequest(String),
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn only_configuration_errors_are_terminal() {
    assert!(!PipelineError::NotConfigured.is_retryable());
    assert!(PipelineError::Timeout(Duration::from_secs(30)).is_retryable());
    assert!(PipelineError::Validation("x".into()).is_retryable());
    assert!(PipelineError::Decode("x".into()).is_retryable());
    assert!(PipelineError::provider("gemini", "HTTP 500").is_retryable());
  }

  #[test]
  fn messages_are_human_readable() {
    let e = PipelineError::provider("nominatim", "HTTP 503");
    assert_eq!(e.to_string(), "nominatim request failed: HTTP 503");
    assert!(PipelineError::NotConfigured.to_string().contains("Settings"));
  }
}
