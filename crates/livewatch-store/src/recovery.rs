//! Startup loading with fallback and quarantine.
//!
//! Order of preference: the local durable file, then the latest remote
//! backup, then an empty model. Every document that fails to decode is
//! copied into the quarantine directory under a timestamped name before
//! anything can overwrite it.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::fs;
use tracing::{error, info, warn};

use livewatch_core::traits::{BackupTransport, LATEST_BACKUP_NAME};
use livewatch_entity::StateDocument;

use crate::durable;
use crate::error::StoreError;

/// Where the loaded model came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// The local durable file was valid.
    Local,
    /// The local file was missing or corrupt; restored from remote backup.
    Backup,
    /// Nothing usable was found; started empty.
    Fresh,
}

impl LoadSource {
    /// Return the source as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Backup => "backup",
            Self::Fresh => "fresh",
        }
    }
}

/// Outcome of startup recovery.
#[derive(Debug, Clone)]
pub struct RecoveryReport {
    /// Where the model came from.
    pub source: LoadSource,
    /// Quarantine copies written during recovery.
    pub quarantined: Vec<PathBuf>,
    /// Number of invariant repairs applied to the loaded document.
    pub repairs: usize,
}

impl RecoveryReport {
    /// Whether the local file must be rewritten before the next cycle.
    pub fn needs_persist(&self) -> bool {
        self.source != LoadSource::Local || self.repairs > 0
    }
}

/// Load the model, falling back to the remote backup and then to empty.
pub async fn load_or_recover(
    state_path: &Path,
    quarantine_dir: &Path,
    backup: Option<&dyn BackupTransport>,
) -> Result<(StateDocument, RecoveryReport), StoreError> {
    let mut quarantined = Vec::new();
    let origin = state_path.display().to_string();

    match durable::read_optional(state_path).await? {
        Some(bytes) => match decode(&origin, &bytes) {
            Ok((doc, repairs)) => {
                info!(
                    path = %origin,
                    communities = doc.communities.len(),
                    repairs,
                    "Loaded state document"
                );
                let report = RecoveryReport {
                    source: LoadSource::Local,
                    quarantined,
                    repairs,
                };
                return Ok((doc, report));
            }
            Err(e) => {
                error!("Local state is corrupt, quarantining: {}", e);
                quarantined.push(quarantine_file(quarantine_dir, state_path).await?);
            }
        },
        None => info!(path = %origin, "No local state document found"),
    }

    if let Some(transport) = backup {
        match transport.download(LATEST_BACKUP_NAME).await {
            Ok(Some(bytes)) => {
                let origin = format!("{}:{}", transport.transport_type(), LATEST_BACKUP_NAME);
                match decode(&origin, &bytes) {
                    Ok((doc, repairs)) => {
                        info!(
                            origin = %origin,
                            communities = doc.communities.len(),
                            "Restored state from remote backup"
                        );
                        let report = RecoveryReport {
                            source: LoadSource::Backup,
                            quarantined,
                            repairs,
                        };
                        return Ok((doc, report));
                    }
                    Err(e) => {
                        error!("Remote backup is corrupt, quarantining: {}", e);
                        quarantined.push(
                            quarantine_bytes(quarantine_dir, "backup-latest.json", &bytes).await?,
                        );
                    }
                }
            }
            Ok(None) => info!(
                transport = transport.transport_type(),
                "No remote backup available"
            ),
            Err(e) => warn!("Failed to download remote backup: {}", e),
        }
    }

    warn!("Starting with an empty state document");
    let report = RecoveryReport {
        source: LoadSource::Fresh,
        quarantined,
        repairs: 0,
    };
    Ok((StateDocument::default(), report))
}

/// Decode and normalize a document, returning the repair count.
pub fn decode(origin: &str, bytes: &[u8]) -> Result<(StateDocument, usize), StoreError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(StoreError::corruption(origin, "document is empty"));
    }
    let mut doc =
        StateDocument::from_slice(bytes).map_err(|e| StoreError::corruption(origin, e))?;
    if doc.metadata.version > livewatch_entity::SCHEMA_VERSION {
        warn!(
            origin,
            version = doc.metadata.version,
            "State document was written by a newer schema; unknown fields are ignored"
        );
    }
    let repairs = doc.normalize();
    Ok((doc, repairs))
}

/// Copy a corrupt file into the quarantine directory.
pub async fn quarantine_file(quarantine_dir: &Path, source: &Path) -> Result<PathBuf, StoreError> {
    fs::create_dir_all(quarantine_dir)
        .await
        .map_err(|e| StoreError::io(quarantine_dir, e))?;

    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "state.json".to_string());
    let dest = quarantine_dir.join(quarantine_name(&name));

    fs::copy(source, &dest)
        .await
        .map_err(|e| StoreError::io(&dest, e))?;

    warn!(from = %source.display(), to = %dest.display(), "Quarantined corrupt state file");
    Ok(dest)
}

/// Write corrupt bytes (e.g. a downloaded backup) into quarantine.
pub async fn quarantine_bytes(
    quarantine_dir: &Path,
    name: &str,
    bytes: &[u8],
) -> Result<PathBuf, StoreError> {
    let dest = quarantine_dir.join(quarantine_name(name));
    durable::write_atomic(&dest, bytes).await?;
    warn!(to = %dest.display(), "Quarantined corrupt backup");
    Ok(dest)
}

fn quarantine_name(file_name: &str) -> String {
    let stamp = Utc::now().format("%Y%m%dT%H%M%S%.6fZ");
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}.corrupt-{stamp}.{ext}"),
        _ => format!("{file_name}.corrupt-{stamp}"),
    }
}
