//! Platform link commands.

use clap::{Args, Subcommand};

use livewatch_core::config::AppConfig;
use livewatch_core::error::AppError;
use livewatch_core::types::{CommunityId, MemberId, Platform};

use crate::output;

/// Arguments for link commands
#[derive(Debug, Args)]
pub struct LinkArgs {
    /// Link subcommand
    #[command(subcommand)]
    pub command: LinkCommand,
}

/// Link subcommands
#[derive(Debug, Subcommand)]
pub enum LinkCommand {
    /// Link a member to a channel on a platform
    Add {
        /// Community (server) id
        community: CommunityId,
        /// Member id
        member: MemberId,
        /// Platform: twitch or youtube
        platform: Platform,
        /// Channel login (Twitch) or channel id (YouTube)
        handle: String,
    },
    /// Remove a member's link on a platform
    Remove {
        /// Community (server) id
        community: CommunityId,
        /// Member id
        member: MemberId,
        /// Platform: twitch or youtube
        platform: Platform,
    },
}

/// Execute link commands
pub async fn execute(args: &LinkArgs, config: &AppConfig) -> Result<(), AppError> {
    let store = super::open_store(config).await?;

    match &args.command {
        LinkCommand::Add {
            community,
            member,
            platform,
            handle,
        } => {
            let created = store.add_subject_link(*community, *member, *platform, handle)?;
            super::save(&store).await?;

            if created {
                output::print_success(&format!(
                    "Linked member {} to {} '{}' in community {}",
                    member,
                    platform.display_name(),
                    handle.trim(),
                    community
                ));
            } else {
                output::print_warning(&format!(
                    "Member {} is already linked to {} '{}'",
                    member,
                    platform.display_name(),
                    handle.trim()
                ));
            }
        }
        LinkCommand::Remove {
            community,
            member,
            platform,
        } => {
            let revoke = store.remove_subject_link(*community, *member, *platform)?;
            super::save(&store).await?;

            output::print_success(&format!(
                "Removed {} link of member {} in community {}",
                platform.display_name(),
                member,
                community
            ));
            if revoke.is_some() {
                output::print_warning(
                    "The member was live on this platform only; the server revokes the live role on its next polling cycle",
                );
            }
        }
    }

    Ok(())
}
