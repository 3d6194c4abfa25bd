//! CLI command definitions and dispatch.

pub mod backup;
pub mod community;
pub mod link;
pub mod list;

use std::time::Duration;

use chrono::Utc;
use clap::{Parser, Subcommand};

use livewatch_core::config::AppConfig;
use livewatch_core::error::AppError;
use livewatch_store::StateStore;
use livewatch_store::backup::build_transport;

use crate::output::{self, OutputFormat};

/// LiveWatch: stream presence monitoring for chat communities
///
/// Edits the durable state file directly. Stop the server first; it
/// overwrites the file at the end of every polling cycle.
#[derive(Debug, Parser)]
#[command(name = "livewatch", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage platform links
    Link(link::LinkArgs),
    /// Manage community settings
    Community(community::CommunityArgs),
    /// List a community's linked subjects
    List(list::ListArgs),
    /// Remote backups
    Backup(backup::BackupArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        let config = load_config(&self.config)?;
        match &self.command {
            Commands::Link(args) => link::execute(args, &config).await,
            Commands::Community(args) => community::execute(args, &config, self.format).await,
            Commands::List(args) => list::execute(args, &config, self.format).await,
            Commands::Backup(args) => backup::execute(args, &config).await,
        }
    }
}

/// Helper: load configuration from file
pub fn load_config(config_path: &str) -> Result<AppConfig, AppError> {
    AppConfig::load(config_path)
}

/// Helper: open the state store the same way the server does, recovering
/// from a corrupt file if needed.
pub async fn open_store(config: &AppConfig) -> Result<StateStore, AppError> {
    tokio::fs::create_dir_all(&config.storage.data_root)
        .await
        .map_err(|e| {
            AppError::storage(format!(
                "Failed to create data root '{}': {}",
                config.storage.data_root, e
            ))
        })?;

    let transport = build_transport(
        &config.backup,
        Duration::from_secs(config.platforms.request_timeout_seconds),
    )
    .await?;
    let (store, report) = StateStore::open(&config.storage, transport).await?;

    for path in &report.quarantined {
        output::print_warning(&format!(
            "Corrupt state quarantined to '{}' (loaded from {})",
            path.display(),
            report.source.as_str()
        ));
    }

    if store
        .metadata()
        .saved_within(Utc::now(), config.scheduler.poll_interval())
    {
        output::print_warning(
            "The state file was written within the last poll interval; if the server \
             is running it may overwrite these changes",
        );
    }
    Ok(store)
}

/// Helper: write the store back to disk.
pub async fn save(store: &StateStore) -> Result<(), AppError> {
    store.persist().await.map_err(AppError::from)
}
