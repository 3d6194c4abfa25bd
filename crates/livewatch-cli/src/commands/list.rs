//! Subject listing.

use clap::Args;
use tabled::Tabled;

use livewatch_core::config::AppConfig;
use livewatch_core::error::AppError;
use livewatch_core::types::CommunityId;
use livewatch_store::SubjectListing;

use crate::output::{self, OutputFormat};

/// Arguments for the list command
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Community (server) id
    pub community: CommunityId,

    /// Only show links that are currently live
    #[arg(long)]
    pub live: bool,
}

/// Subject display row for table output
#[derive(Debug, Tabled)]
struct SubjectRow {
    #[tabled(rename = "Member")]
    member: String,
    #[tabled(rename = "Platform")]
    platform: String,
    #[tabled(rename = "Handle")]
    handle: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Checked")]
    checked: String,
}

impl From<&SubjectListing> for SubjectRow {
    fn from(l: &SubjectListing) -> Self {
        let status = match (l.is_live, l.since) {
            (true, Some(since)) => format!("LIVE since {}", since.format("%Y-%m-%d %H:%M")),
            (true, None) => "LIVE".to_string(),
            (false, _) => "offline".to_string(),
        };
        Self {
            member: l.member.to_string(),
            platform: l.platform.display_name().to_string(),
            handle: l.handle.clone(),
            status,
            title: l.title.clone().unwrap_or_default(),
            checked: l
                .last_checked_at
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "never".to_string()),
        }
    }
}

/// Execute the list command
pub async fn execute(
    args: &ListArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let store = super::open_store(config).await?;

    let listings: Vec<SubjectListing> = store
        .list_subjects(args.community)
        .into_iter()
        .filter(|l| !args.live || l.is_live)
        .collect();
    let rows: Vec<SubjectRow> = listings.iter().map(SubjectRow::from).collect();

    output::print_list(&rows, &listings, format);
    Ok(())
}
