//! Per-cycle summary.

use std::time::Duration;

use crate::dispatcher::DispatchReport;

/// Counters for one polling cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Communities visited.
    pub communities: usize,
    /// Adapter checks attempted.
    pub checks: usize,
    /// Checks that failed or did not finish before the deadline. Their links
    /// keep their previous state.
    pub failed_checks: usize,
    /// Links skipped because no adapter is registered for their platform.
    pub unsupported_links: usize,
    /// Live flag changes committed.
    pub transitions: usize,
    /// Intents whose side effect ran or was already in place.
    pub intents_applied: usize,
    /// Intents skipped for missing community configuration.
    pub intents_skipped: usize,
    /// Intents whose side effect failed.
    pub intents_failed: usize,
    /// Whether the end-of-cycle persist succeeded.
    pub persisted: bool,
    /// Wall-clock duration of the cycle.
    pub duration: Duration,
}

impl CycleReport {
    /// Add one community's dispatch results.
    pub fn add_dispatch(&mut self, report: &DispatchReport) {
        self.intents_applied += report.applied();
        self.intents_skipped += report.skipped();
        self.intents_failed += report.failed();
    }

    /// Total intents dispatched.
    pub fn intents(&self) -> usize {
        self.intents_applied + self.intents_skipped + self.intents_failed
    }
}
