//! Exponential backoff with jitter.

use std::time::Duration;
use rand::Rng;

use crate::config::AcceptConfig;

/// Calculate exponential backoff delay with jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    // Apply jitter (0 to 10% of the delay)
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

/// Retry policy for the accept loop.
///
/// Disabled by default: the first accept failure ends the loop.
#[derive(Debug, Clone)]
pub struct AcceptRetry {
    enabled: bool,
    max_retries: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
    failures: u32,
}

impl AcceptRetry {
    pub fn from_config(config: &AcceptConfig) -> Self {
        Self {
            enabled: config.retry_enabled,
            max_retries: config.max_retries,
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
            failures: 0,
        }
    }

    /// Record a failure. Returns the delay before the next attempt, or
    /// `None` when the loop should give up.
    pub fn on_failure(&mut self) -> Option<Duration> {
        if !self.enabled || self.failures >= self.max_retries {
            return None;
        }
        self.failures += 1;
        Some(calculate_backoff(self.failures, self.base_delay_ms, self.max_delay_ms))
    }

    /// Reset the consecutive-failure count after a successful accept.
    pub fn on_success(&mut self) {
        self.failures = 0;
    }
}
