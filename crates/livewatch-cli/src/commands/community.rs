//! Community configuration commands.

use clap::{Args, Subcommand};
use serde::Serialize;

use livewatch_core::config::AppConfig;
use livewatch_core::error::AppError;
use livewatch_core::types::{ChannelId, CommunityId, RoleId};
use livewatch_entity::CommunityConfig;

use crate::output::{self, OutputFormat};

/// Arguments for community commands
#[derive(Debug, Args)]
pub struct CommunityArgs {
    /// Community subcommand
    #[command(subcommand)]
    pub command: CommunityCommand,
}

/// Community subcommands
#[derive(Debug, Subcommand)]
pub enum CommunityCommand {
    /// Update a community's settings. Options not given keep their value.
    Set {
        /// Community (server) id
        community: CommunityId,
        /// Role granted while a member is live
        #[arg(long, conflicts_with = "clear_role")]
        role: Option<RoleId>,
        /// Channel receiving live notifications
        #[arg(long, conflicts_with = "clear_channel")]
        channel: Option<ChannelId>,
        /// Include the community in remote backups
        #[arg(long)]
        backup: Option<bool>,
        /// Stop granting a live role
        #[arg(long)]
        clear_role: bool,
        /// Stop posting notifications
        #[arg(long)]
        clear_channel: bool,
    },
    /// Show a community's settings
    Show {
        /// Community (server) id
        community: CommunityId,
    },
    /// Remove a community and all of its links
    Remove {
        /// Community (server) id
        community: CommunityId,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Settings view for output
#[derive(Debug, Serialize)]
struct CommunityView {
    community: CommunityId,
    #[serde(flatten)]
    config: CommunityConfig,
    subjects: usize,
}

/// Execute community commands
pub async fn execute(
    args: &CommunityArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let store = super::open_store(config).await?;

    match &args.command {
        CommunityCommand::Set {
            community,
            role,
            channel,
            backup,
            clear_role,
            clear_channel,
        } => {
            let mut settings = store.community_config(*community).unwrap_or_default();
            if *clear_role {
                settings.live_role_id = None;
            } else if role.is_some() {
                settings.live_role_id = *role;
            }
            if *clear_channel {
                settings.notify_channel_id = None;
            } else if channel.is_some() {
                settings.notify_channel_id = *channel;
            }
            if let Some(enabled) = backup {
                settings.backup_enabled = *enabled;
            }

            store.set_community_config(*community, settings.clone());
            super::save(&store).await?;

            output::print_success(&format!("Community {} updated", community));
            print_settings(&settings);
        }
        CommunityCommand::Show { community } => {
            let settings = store
                .community_config(*community)
                .ok_or_else(|| AppError::not_found(format!("Community {} not found", community)))?;
            let view = CommunityView {
                community: *community,
                config: settings.clone(),
                subjects: store.list_subjects(*community).len(),
            };

            match format {
                OutputFormat::Json => output::print_item(&view, format),
                OutputFormat::Table => {
                    println!("Community {}", community);
                    print_settings(&settings);
                    output::print_kv("Links", &view.subjects.to_string());
                }
            }
        }
        CommunityCommand::Remove { community, yes } => {
            if !yes {
                let confirmed = dialoguer::Confirm::new()
                    .with_prompt(format!(
                        "Remove community {} and all of its links?",
                        community
                    ))
                    .default(false)
                    .interact()
                    .map_err(|e| AppError::internal(format!("Input error: {}", e)))?;
                if !confirmed {
                    output::print_warning("Aborted");
                    return Ok(());
                }
            }

            store.remove_community(*community)?;
            super::save(&store).await?;
            output::print_success(&format!("Community {} removed", community));
        }
    }

    Ok(())
}

fn print_settings(settings: &CommunityConfig) {
    let or_unset = |v: Option<String>| v.unwrap_or_else(|| "(not set)".to_string());
    output::print_kv(
        "Live role",
        &or_unset(settings.live_role_id.map(|r| r.to_string())),
    );
    output::print_kv(
        "Notify channel",
        &or_unset(settings.notify_channel_id.map(|c| c.to_string())),
    );
    output::print_kv("Backups", if settings.backup_enabled { "on" } else { "off" });
}
