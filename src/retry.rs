//! Fixed-delay retry for provider calls.
//!
//! Attempts are sequential, the delay between them is constant (no jitter, no
//! exponential growth), and non-retryable errors stop the loop immediately.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::PipelineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
  pub max_attempts: u32,
  pub delay: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self { max_attempts: 3, delay: Duration::from_secs(2) }
  }
}

impl RetryPolicy {
  pub fn new(max_attempts: u32, delay: Duration) -> Self {
    Self { max_attempts: max_attempts.max(1), delay }
  }

  /// Run `op` until it succeeds, fails with a non-retryable error, or the
  /// attempt budget is spent. The closure receives the 1-based attempt number.
  pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, PipelineError>
  where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, PipelineError>>,
  {
    let mut attempt = 1;
    loop {
      match op(attempt).await {
        Ok(v) => return Ok(v),
        Err(e) if !e.is_retryable() => return Err(e),
        Err(e) if attempt >= self.max_attempts => {
          warn!(target: "edai_backend", %what, attempt, error = %e, "Giving up after final attempt");
          return Err(e);
        }
        Err(e) => {
          warn!(target: "edai_backend", %what, attempt, error = %e, "Attempt failed; retrying");
          tokio::time::sleep(self.delay).await;
          attempt += 1;
        }
      }
    }
  }
}
