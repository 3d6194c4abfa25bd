//! Remote backup transport trait.

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::result::AppResult;

/// Name under which every transport exposes its most recent upload.
pub const LATEST_BACKUP_NAME: &str = "latest";

/// Reference to an uploaded backup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRef {
    /// Transport-specific name, usable with [`BackupTransport::download`].
    pub name: String,
    /// Where the backup ended up (path or URL).
    pub location: String,
    /// Upload time.
    pub uploaded_at: DateTime<Utc>,
    /// Uploaded size in bytes.
    pub size_bytes: u64,
}

/// Ships durable state files to remote storage and fetches them back.
#[async_trait]
pub trait BackupTransport: Send + Sync + std::fmt::Debug + 'static {
    /// Return the transport type name (e.g. "directory", "webdav").
    fn transport_type(&self) -> &str;

    /// Upload the file at `local_path`. The upload also becomes the
    /// [`LATEST_BACKUP_NAME`] backup.
    async fn upload(&self, local_path: &Path) -> AppResult<BackupRef>;

    /// Download a backup by name. Returns `Ok(None)` when it does not exist.
    async fn download(&self, name: &str) -> AppResult<Option<Bytes>>;
}
