//! Crash-safe file writes.
//!
//! Writes go to a uniquely named temporary file in the destination
//! directory, are synced to disk, and are then renamed over the target, so
//! a reader never observes a half-written document.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::StoreError;

/// Atomically replace `path` with `bytes`.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let parent = ensure_parent(path).await?;
    let tmp = temp_path(&parent, path);

    if let Err(e) = write_and_sync(&tmp, bytes).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e);
    }

    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(StoreError::io(path, e));
    }

    sync_dir(&parent).await;
    debug!(path = %path.display(), bytes = bytes.len(), "Wrote file atomically");
    Ok(())
}

/// Read a whole file. `Ok(None)` when it does not exist.
pub async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

async fn ensure_parent(path: &Path) -> Result<PathBuf, StoreError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)
        .await
        .map_err(|e| StoreError::io(&parent, e))?;
    Ok(parent)
}

fn temp_path(parent: &Path, target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "state".to_string());
    parent.join(format!(".{name}.{}.tmp", uuid::Uuid::new_v4().simple()))
}

async fn write_and_sync(tmp: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let mut file = fs::File::create(tmp)
        .await
        .map_err(|e| StoreError::io(tmp, e))?;
    file.write_all(bytes)
        .await
        .map_err(|e| StoreError::io(tmp, e))?;
    file.sync_all().await.map_err(|e| StoreError::io(tmp, e))?;
    Ok(())
}

#[cfg(unix)]
async fn sync_dir(dir: &Path) {
    if let Ok(handle) = fs::File::open(dir).await {
        let _ = handle.sync_all().await;
    }
}

#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) {}
