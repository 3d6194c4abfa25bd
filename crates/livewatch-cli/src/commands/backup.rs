//! Remote backup commands.

use clap::{Args, Subcommand};

use livewatch_core::config::AppConfig;
use livewatch_core::error::AppError;

use crate::output;

/// Arguments for backup commands
#[derive(Debug, Args)]
pub struct BackupArgs {
    /// Backup subcommand
    #[command(subcommand)]
    pub command: BackupCommand,
}

/// Backup subcommands
#[derive(Debug, Subcommand)]
pub enum BackupCommand {
    /// Upload a backup now
    Run,
    /// Show when the last backup was taken
    Status,
}

/// Execute backup commands
pub async fn execute(args: &BackupArgs, config: &AppConfig) -> Result<(), AppError> {
    let store = super::open_store(config).await?;

    match &args.command {
        BackupCommand::Run => match store.backup().await {
            Some(backup) => {
                super::save(&store).await?;
                output::print_success(&format!(
                    "Backup '{}' stored at {} ({} bytes)",
                    backup.name, backup.location, backup.size_bytes
                ));
            }
            None => output::print_warning(
                "No backup taken: backups are disabled, no community opted in, or the upload failed",
            ),
        },
        BackupCommand::Status => {
            let metadata = store.metadata();
            output::print_kv("Provider", &format!("{:?}", config.backup.provider));
            output::print_kv("Schedule", &config.backup.schedule);
            output::print_kv(
                "Last backup",
                &metadata
                    .last_backup_at
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "never".to_string()),
            );
            output::print_kv(
                "Last saved",
                &metadata
                    .saved_at
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "never".to_string()),
            );
        }
    }

    Ok(())
}
