//! Durable state and backup configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Durable state file configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for all runtime data.
    #[serde(default = "default_data_root")]
    pub data_root: String,
    /// File name of the durable state document, relative to `data_root`.
    #[serde(default = "default_state_file")]
    pub state_file: String,
    /// Directory (relative to `data_root`) that receives quarantined copies
    /// of corrupt state documents.
    #[serde(default = "default_quarantine_dir")]
    pub quarantine_dir: String,
}

impl StorageConfig {
    /// Absolute-or-relative path of the durable state document.
    pub fn state_path(&self) -> PathBuf {
        PathBuf::from(&self.data_root).join(&self.state_file)
    }

    /// Path of the quarantine directory.
    pub fn quarantine_path(&self) -> PathBuf {
        PathBuf::from(&self.data_root).join(&self.quarantine_dir)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
            state_file: default_state_file(),
            quarantine_dir: default_quarantine_dir(),
        }
    }
}

/// Which remote backup transport to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackupProviderKind {
    /// Copy backups into a (typically mounted) directory.
    #[default]
    Directory,
    /// Upload backups to a WebDAV collection.
    WebDav,
    /// Backups disabled.
    None,
}

/// Remote backup configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Transport used to ship backups.
    #[serde(default)]
    pub provider: BackupProviderKind,
    /// Cron expression (with seconds) for the backup job.
    #[serde(default = "default_schedule")]
    pub schedule: String,
    /// Target directory for the directory transport.
    #[serde(default = "default_backup_dir")]
    pub directory: String,
    /// Number of timestamped backups the directory transport retains.
    #[serde(default = "default_keep")]
    pub keep: usize,
    /// WebDAV transport settings.
    #[serde(default)]
    pub webdav: WebDavBackupConfig,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            provider: BackupProviderKind::default(),
            schedule: default_schedule(),
            directory: default_backup_dir(),
            keep: default_keep(),
            webdav: WebDavBackupConfig::default(),
        }
    }
}

/// WebDAV backup target.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WebDavBackupConfig {
    /// Collection URL backups are written under.
    #[serde(default)]
    pub url: String,
    /// Basic auth user name.
    #[serde(default)]
    pub username: String,
    /// Basic auth password.
    #[serde(default)]
    pub password: String,
}

fn default_data_root() -> String {
    "./data".to_string()
}

fn default_state_file() -> String {
    "state.json".to_string()
}

fn default_quarantine_dir() -> String {
    "quarantine".to_string()
}

fn default_schedule() -> String {
    "0 0 * * * *".to_string()
}

fn default_backup_dir() -> String {
    "./data/backups".to_string()
}

fn default_keep() -> usize {
    24
}
