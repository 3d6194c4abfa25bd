//! Backup transport writing into a local or mounted directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use tokio::fs;
use tracing::{debug, warn};

use livewatch_core::error::{AppError, ErrorKind};
use livewatch_core::result::AppResult;
use livewatch_core::traits::{BackupRef, BackupTransport};

use super::{BACKUP_FILE_PREFIX, latest_file_name, resolve_file_name, timestamped_name};
use crate::durable;

/// Keeps the newest `keep` timestamped backups plus a `latest.json` copy.
#[derive(Debug, Clone)]
pub struct DirectoryBackupTransport {
    root: PathBuf,
    keep: usize,
}

impl DirectoryBackupTransport {
    /// Create the transport, creating the directory if needed.
    pub async fn new(root: impl AsRef<Path>, keep: usize) -> AppResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Backup,
                format!("Failed to create backup directory: {}", root.display()),
                e,
            )
        })?;
        Ok(Self {
            root,
            keep: keep.max(1),
        })
    }

    /// Timestamped backups currently on disk, oldest first.
    pub async fn list(&self) -> AppResult<Vec<String>> {
        let mut entries = fs::read_dir(&self.root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Backup,
                format!("Failed to list backup directory: {}", self.root.display()),
                e,
            )
        })?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            AppError::with_source(ErrorKind::Backup, "Failed to read backup entry", e)
        })? {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(BACKUP_FILE_PREFIX) && name.ends_with(".json") {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    async fn prune(&self) {
        let names = match self.list().await {
            Ok(names) => names,
            Err(e) => {
                warn!("Backup retention skipped: {}", e);
                return;
            }
        };
        let excess = names.len().saturating_sub(self.keep);
        for name in names.into_iter().take(excess) {
            let path = self.root.join(&name);
            match fs::remove_file(&path).await {
                Ok(()) => debug!(name = %name, "Pruned old backup"),
                Err(e) => warn!(name = %name, "Failed to prune old backup: {}", e),
            }
        }
    }
}

#[async_trait]
impl BackupTransport for DirectoryBackupTransport {
    fn transport_type(&self) -> &str {
        "directory"
    }

    async fn upload(&self, local_path: &Path) -> AppResult<BackupRef> {
        let bytes = fs::read(local_path).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Backup,
                format!("Failed to read backup source: {}", local_path.display()),
                e,
            )
        })?;

        let uploaded_at = Utc::now();
        let name = timestamped_name(uploaded_at);
        let dest = self.root.join(&name);

        durable::write_atomic(&dest, &bytes)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Backup, "Failed to write backup", e))?;
        durable::write_atomic(&self.root.join(latest_file_name()), &bytes)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Backup, "Failed to update latest backup", e)
            })?;

        self.prune().await;

        Ok(BackupRef {
            name,
            location: dest.display().to_string(),
            uploaded_at,
            size_bytes: bytes.len() as u64,
        })
    }

    async fn download(&self, name: &str) -> AppResult<Option<Bytes>> {
        let path = self.root.join(resolve_file_name(name)?);
        let bytes = durable::read_optional(&path)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Backup, "Failed to read backup", e))?;
        Ok(bytes.map(Bytes::from))
    }
}
