//! Adapter retry policy configuration.

use serde::{Deserialize, Serialize};

/// Retry policy applied around every platform adapter call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per call, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_min_delay")]
    pub min_delay_ms: u64,
    /// Upper bound for any single backoff delay, in milliseconds.
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
    /// Whether to add random jitter to backoff delays.
    #[serde(default = "super::default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            min_delay_ms: default_min_delay(),
            max_delay_ms: default_max_delay(),
            jitter: true,
        }
    }
}

fn default_max_attempts() -> usize {
    3
}

fn default_min_delay() -> u64 {
    250
}

fn default_max_delay() -> u64 {
    5_000
}
