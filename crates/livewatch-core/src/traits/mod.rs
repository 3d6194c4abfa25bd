//! Collaborator traits defined in `livewatch-core` and implemented by
//! other crates (or by test fakes).

pub mod backup;
pub mod chat;
pub mod platform;

pub use backup::{BackupRef, BackupTransport, LATEST_BACKUP_NAME};
pub use chat::{ChatPlatformClient, DispatchError, LiveAnnouncement};
pub use platform::{AdapterError, PlatformAdapter};
