use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backoff shape used between submission attempts.
///
/// The delay before retry `n` (1-indexed) is `min(base_delay * 2^n, max_delay)`
/// plus a uniform jitter in `[0, max_jitter)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    #[serde(with = "crate::app::config::serde_helpers")]
    pub base_delay: Duration,
    #[serde(with = "crate::app::config::serde_helpers")]
    pub max_delay: Duration,
    #[serde(with = "crate::app::config::serde_helpers")]
    pub max_jitter: Duration,
    /// Whether 4xx responses are retried like timeouts and 5xx responses.
    pub retry_client_errors: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(8000),
            max_jitter: Duration::from_millis(200),
            retry_client_errors: true,
        }
    }
}

impl RetryPolicy {
    /// Policy with no sleeping at all, for callers that drive their own pacing.
    pub fn immediate() -> Self {
        Self {
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            max_jitter: Duration::ZERO,
            ..Self::default()
        }
    }

    pub fn with_retry_client_errors(mut self, enabled: bool) -> Self {
        self.retry_client_errors = enabled;
        self
    }

    /// Deterministic part of the delay before retry `attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let multiplier = 2_u64.checked_pow(attempt).unwrap_or(u64::MAX);
        let delay = Duration::from_millis(base_ms.saturating_mul(multiplier));
        std::cmp::min(delay, self.max_delay)
    }

    /// Full delay before retry `attempt`, jitter included.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff(attempt) + self.jitter()
    }

    fn jitter(&self) -> Duration {
        let range_ms = self.max_jitter.as_millis() as u64;
        if range_ms == 0 {
            return Duration::ZERO;
        }
        let mut rng = rand::rng();
        Duration::from_millis(rng.random_range(0..range_ms))
    }
}
