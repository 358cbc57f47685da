use std::time::Duration;

use serde::Deserialize;

/// Number of retries the default executor allows after the first attempt.
pub const DEFAULT_RETRIES: u32 = 2;
/// Fixed wait between two attempts of the default executor.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(2);

/// Retry budget of a [`RequestExecutor`](crate::RequestExecutor).
///
/// Waits are fixed, there is no backoff. Deserializes from e.g.
/// `{"retries": 4, "retry_interval": {"secs": 1, "nanos": 0}}`; missing fields take the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub retries: u32,
    pub retry_interval: Duration,
}

impl RetryConfig {
    /// Total attempts a call may make under this budget.
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            retries: DEFAULT_RETRIES,
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}
