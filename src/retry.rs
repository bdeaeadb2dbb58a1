//! Retry policy for workflow API calls.

use std::time::Duration;

/// Default maximum number of retries after the initial attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default exponential backoff factor between attempts.
pub const DEFAULT_BACKOFF_FACTOR: f64 = 1.5;

/// Which failures are retried, how often, and how long to wait in between.
///
/// A call makes at most `max_retries + 1` attempts. The delay before retry
/// `n` (0-indexed) is `backoff_unit * backoff_factor^n`; no delay is applied
/// after the final attempt.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Zero disables retrying entirely.
    pub max_retries: u32,
    /// Exponential growth factor for the backoff delay. Must be > 1.0.
    pub backoff_factor: f64,
    /// Base delay unit the factor is applied to.
    pub backoff_unit: Duration,
    /// Retry when no response was received (DNS, connect, timeout).
    pub retry_on_network_error: bool,
    /// Retry on HTTP 5xx responses.
    pub retry_on_server_error: bool,
    /// Retry on HTTP 429. Off by default; rate limits are treated as terminal.
    pub retry_on_rate_limit: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            backoff_unit: Duration::from_secs(1),
            retry_on_network_error: true,
            retry_on_server_error: true,
            retry_on_rate_limit: false,
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

    /// Delay to sleep before retry attempt `attempt` (0-indexed).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_unit
            .mul_f64(self.backoff_factor.powi(attempt as i32))
    }
}
