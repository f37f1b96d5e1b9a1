//! Exponential-backoff retry policy.
//!
//! A [`RetryPolicy`] decides how many times a single model is asked again
//! and how long to wait in between.  It only retries errors that
//! [`AgentError::is_retryable`] accepts; anything else is returned at once so
//! the model chain can act on it.

use std::future::Future;
use std::time::Duration;

use crate::error::{AgentError, Result};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Retry configuration for one model.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the first (0 = no retries).
    pub max_retries: u32,

    /// Delay before the first retry.
    pub initial_delay: Duration,

    /// Multiplier applied to the delay after each retry.
    pub backoff_factor: f64,

    /// Maximum delay between retries (caps the backoff).
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Total attempts allowed per model (first try plus retries).
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// The delay before retry number `retry` (zero-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let scaled = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(retry as i32);
        Duration::from_secs_f64(scaled.min(self.max_delay.as_secs_f64()))
    }

    /// Every delay this policy can sleep for one model, in order.
    pub fn schedule(&self) -> Vec<Duration> {
        (0..self.max_retries).map(|n| self.delay_for(n)).collect()
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent.
    ///
    /// `op` receives the one-based attempt number.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts();
        let mut last_error: Option<AgentError> = None;

        for attempt in 1..=max_attempts {
            tracing::debug!(label, attempt, max_attempts, "completion attempt");

            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = self.delay_for(attempt - 1);
                    tracing::warn!(
                        label,
                        attempt,
                        status = ?e.status(),
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "retryable completion failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            AgentError::Internal(format!("retry loop for {label} made no attempts"))
        }))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
