//! In-process backup transport.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use tokio::fs;

use livewatch_core::error::AppError;
use livewatch_core::result::AppResult;
use livewatch_core::traits::{BackupRef, BackupTransport, LATEST_BACKUP_NAME};

use super::timestamped_name;

/// Keeps backups in memory. Used by tests and for dry runs.
#[derive(Debug, Default)]
pub struct MemoryBackupTransport {
    objects: Mutex<BTreeMap<String, Bytes>>,
    fail_uploads: AtomicBool,
}

impl MemoryBackupTransport {
    /// Create an empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the `latest` backup.
    pub fn with_latest(bytes: impl Into<Bytes>) -> Self {
        let transport = Self::default();
        transport.insert(LATEST_BACKUP_NAME, bytes);
        transport
    }

    /// Store an object under `name`.
    pub fn insert(&self, name: &str, bytes: impl Into<Bytes>) {
        self.objects
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.to_string(), bytes.into());
    }

    /// Make subsequent uploads fail.
    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    /// Number of timestamped uploads held.
    pub fn upload_count(&self) -> usize {
        self.objects
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .filter(|k| k.as_str() != LATEST_BACKUP_NAME)
            .count()
    }

    /// The current `latest` object.
    pub fn latest(&self) -> Option<Bytes> {
        self.objects
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(LATEST_BACKUP_NAME)
            .cloned()
    }
}

#[async_trait]
impl BackupTransport for MemoryBackupTransport {
    fn transport_type(&self) -> &str {
        "memory"
    }

    async fn upload(&self, local_path: &Path) -> AppResult<BackupRef> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(AppError::backup("memory transport is failing uploads"));
        }

        let bytes = Bytes::from(fs::read(local_path).await?);
        let uploaded_at = Utc::now();
        let name = timestamped_name(uploaded_at);
        self.insert(&name, bytes.clone());
        self.insert(LATEST_BACKUP_NAME, bytes.clone());

        Ok(BackupRef {
            location: format!("memory://{name}"),
            name,
            uploaded_at,
            size_bytes: bytes.len() as u64,
        })
    }

    async fn download(&self, name: &str) -> AppResult<Option<Bytes>> {
        Ok(self
            .objects
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned())
    }
}
