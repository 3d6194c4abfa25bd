//! # livewatch-worker
//!
//! The polling engine: a scheduler that runs one cycle per tick, fans adapter
//! calls out under a concurrency bound, turns observations into intents with
//! the transition detector, executes intents through the dispatcher, and
//! persists the store once per cycle. A separate cron job ships backups.

pub mod backup_runner;
pub mod detector;
pub mod dispatcher;
pub mod reconcile;
pub mod report;
pub mod retry;
pub mod scheduler;

pub use backup_runner::BackupRunner;
pub use dispatcher::{DispatchOutcome, DispatchReport, DispatchStatus, Dispatcher};
pub use report::CycleReport;
pub use retry::RetryPolicy;
pub use scheduler::{PresenceScheduler, SchedulerState};
