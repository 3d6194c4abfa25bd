//! Polling scheduler configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Presence polling scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Whether polling is enabled.
    #[serde(default = "super::default_true")]
    pub enabled: bool,
    /// Interval in seconds between poll cycles.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Hard wall-clock limit for one cycle, in seconds.
    #[serde(default = "default_cycle_timeout")]
    pub cycle_timeout_seconds: u64,
    /// Maximum number of concurrent adapter calls.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// How long shutdown waits for an in-flight cycle, in seconds.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_seconds: u64,
}

impl SchedulerConfig {
    /// Poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds.max(1))
    }

    /// Cycle timeout as a [`Duration`].
    pub fn cycle_timeout(&self) -> Duration {
        Duration::from_secs(self.cycle_timeout_seconds.max(1))
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_seconds: default_poll_interval(),
            cycle_timeout_seconds: default_cycle_timeout(),
            concurrency: default_concurrency(),
            shutdown_grace_seconds: default_shutdown_grace(),
        }
    }
}

fn default_poll_interval() -> u64 {
    300
}

fn default_cycle_timeout() -> u64 {
    240
}

fn default_concurrency() -> usize {
    8
}

fn default_shutdown_grace() -> u64 {
    30
}
