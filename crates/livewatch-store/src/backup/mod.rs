//! Remote backup transports.

pub mod directory;
pub mod memory;
pub mod webdav;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::info;

use livewatch_core::config::{BackupConfig, BackupProviderKind};
use livewatch_core::error::AppError;
use livewatch_core::result::AppResult;
use livewatch_core::traits::{BackupTransport, LATEST_BACKUP_NAME};

pub use directory::DirectoryBackupTransport;
pub use memory::MemoryBackupTransport;
pub use webdav::WebDavBackupTransport;

/// Prefix shared by every timestamped backup file.
pub const BACKUP_FILE_PREFIX: &str = "livewatch-";

const BACKUP_FILE_EXT: &str = ".json";

/// Build the transport selected in configuration. `None` means backups are
/// disabled.
pub async fn build_transport(
    config: &BackupConfig,
    request_timeout: Duration,
) -> AppResult<Option<Arc<dyn BackupTransport>>> {
    let transport: Arc<dyn BackupTransport> = match config.provider {
        BackupProviderKind::None => {
            info!("Remote backups disabled");
            return Ok(None);
        }
        BackupProviderKind::Directory => {
            Arc::new(DirectoryBackupTransport::new(&config.directory, config.keep).await?)
        }
        BackupProviderKind::WebDav => {
            Arc::new(WebDavBackupTransport::new(&config.webdav, request_timeout)?)
        }
    };
    info!(
        transport = transport.transport_type(),
        "Remote backup transport ready"
    );
    Ok(Some(transport))
}

/// File name for a backup taken at `at`. Names sort chronologically.
pub fn timestamped_name(at: DateTime<Utc>) -> String {
    format!(
        "{BACKUP_FILE_PREFIX}{}{BACKUP_FILE_EXT}",
        at.format("%Y%m%dT%H%M%S%.6fZ")
    )
}

/// Map a backup name to the file name stored by a transport.
///
/// Only bare names are accepted; anything that could escape the backup
/// location is rejected.
pub fn resolve_file_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
    {
        return Err(AppError::validation(format!(
            "Invalid backup name: '{name}'"
        )));
    }
    if name.ends_with(BACKUP_FILE_EXT) {
        Ok(name.to_string())
    } else {
        Ok(format!("{name}{BACKUP_FILE_EXT}"))
    }
}

/// File name of the rolling latest copy.
pub fn latest_file_name() -> String {
    format!("{LATEST_BACKUP_NAME}{BACKUP_FILE_EXT}")
}
