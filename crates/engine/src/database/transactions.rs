//! Retry policy for conflicting transactions

use std::time::Duration;

/// How `Database::transaction_with_retry` retries conflict aborts
///
/// Attempt `n` (counting from 0) sleeps `base_delay * 2^n`, capped at
/// `max_delay`, before running the closure again. Other errors are never
/// retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Sleep before the first retry
    pub base_delay: Duration,
    /// Upper bound on any single sleep
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(100),
        }
    }
}

impl RetryConfig {
    /// Run once, never retry
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Retry up to `n` times
    pub fn retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    /// Set the first sleep and the cap
    pub fn backoff(mut self, base: Duration, max: Duration) -> Self {
        self.base_delay = base;
        self.max_delay = max;
        self
    }

    pub(crate) fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }
}
