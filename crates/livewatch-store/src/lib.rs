//! # livewatch-store
//!
//! The durable presence state store. Owns the in-memory model, commits
//! per-link deltas under row-level locks, flushes the full model with an
//! atomic write, recovers from corrupt or missing files (quarantining the
//! bad copy first), and ships best-effort backups through a
//! [`BackupTransport`](livewatch_core::traits::BackupTransport).

pub mod backup;
pub mod commands;
pub mod durable;
pub mod error;
pub mod recovery;
pub mod store;

pub use commands::SubjectListing;
pub use error::StoreError;
pub use recovery::{LoadSource, RecoveryReport};
pub use store::StateStore;
