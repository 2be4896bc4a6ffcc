//! Bounded retry with exponential backoff for content store calls

use pubseal_core::config::RetryConfig;
use pubseal_storage::{StoreError, StoreResult};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Each attempt is abandoned after this long and counts as transient
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
            initial_backoff: Duration::from_millis(cfg.initial_backoff_ms),
            max_backoff: Duration::from_millis(cfg.max_backoff_ms),
            attempt_timeout: Duration::from_secs(cfg.attempt_timeout_secs),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `retry` (0-indexed), capped at `max_backoff`.
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    /// Equal jitter: a uniform delay in `[backoff / 2, backoff]` for retry
    /// number `retry`.
    pub fn jittered_backoff_for(&self, retry: u32) -> Duration {
        let ceiling = self.backoff_for(retry);
        let floor = ceiling / 2;
        let spread = (ceiling - floor).as_micros() as u64;
        floor + Duration::from_micros(rand::thread_rng().gen_range(0..=spread))
    }
}

/// Run `op` until it succeeds, fails permanently, or the attempt budget is
/// spent.
///
/// Only [`StoreError::Unavailable`] and per-attempt timeouts are retried.
/// Exhausting the budget yields `Unavailable` carrying the last cause.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> StoreResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut last_cause = String::new();

    for attempt in 0..attempts {
        let outcome = match tokio::time::timeout(policy.attempt_timeout, op()).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Unavailable(format!(
                "timed out after {:?}",
                policy.attempt_timeout
            ))),
        };

        match outcome {
            Ok(value) => {
                if attempt > 0 {
                    debug!(op = what, attempt = attempt + 1, "store call recovered");
                }
                return Ok(value);
            }
            Err(e) if e.is_transient() => {
                last_cause = e.to_string();
                if attempt + 1 < attempts {
                    let backoff = policy.jittered_backoff_for(attempt);
                    warn!(
                        op = what,
                        attempt = attempt + 1,
                        backoff_ms = backoff.as_millis() as u64,
                        "transient store failure: {e}"
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
            Err(e) => return Err(e),
        }
    }

    Err(StoreError::Unavailable(format!(
        "{what} failed after {attempts} attempts: {last_cause}"
    )))
}
