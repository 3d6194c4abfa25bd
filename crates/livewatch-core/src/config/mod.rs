//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section. Every field carries a serde default so a partial file (or no
//! file at all) still produces a usable configuration.

pub mod discord;
pub mod logging;
pub mod platform;
pub mod retry;
pub mod scheduler;
pub mod storage;

use serde::{Deserialize, Serialize};

pub use self::discord::DiscordConfig;
pub use self::logging::LoggingConfig;
pub use self::platform::{PlatformsConfig, TwitchConfig, YouTubeConfig};
pub use self::retry::RetryConfig;
pub use self::scheduler::SchedulerConfig;
pub use self::storage::{BackupConfig, BackupProviderKind, StorageConfig, WebDavBackupConfig};

use crate::error::AppError;

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "LIVEWATCH";

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Polling scheduler settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Adapter retry policy settings.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Durable state file settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Remote backup settings.
    #[serde(default)]
    pub backup: BackupConfig,
    /// Streaming platform credentials.
    #[serde(default)]
    pub platforms: PlatformsConfig,
    /// Chat platform settings.
    #[serde(default)]
    pub discord: DiscordConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a single TOML file plus environment overrides.
    ///
    /// Environment variables use the form `LIVEWATCH__SECTION__KEY`.
    pub fn load(path: &str) -> Result<Self, AppError> {
        Self::build(&[path])
    }

    /// Load `config/default`, then the `config/{env}` overlay, then
    /// environment overrides.
    pub fn load_layered(base_path: &str, env: &str) -> Result<Self, AppError> {
        let overlay = format!("config/{env}");
        Self::build(&[base_path, &overlay])
    }

    fn build(paths: &[&str]) -> Result<Self, AppError> {
        let mut builder = config::Config::builder();
        for path in paths {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}

fn default_true() -> bool {
    true
}
