//! Discord REST client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use livewatch_core::config::DiscordConfig;
use livewatch_core::error::{AppError, ErrorKind};
use livewatch_core::result::AppResult;
use livewatch_core::traits::{ChatPlatformClient, DispatchError, LiveAnnouncement};
use livewatch_core::types::{ChannelId, CommunityId, MemberId, RoleId};

use crate::formatter::render_announcement;

#[derive(Debug, Deserialize)]
struct GuildMember {
    #[serde(default)]
    roles: Vec<String>,
}

/// Bot-authenticated Discord REST v10 client.
#[derive(Debug, Clone)]
pub struct DiscordClient {
    client: Client,
    api_base: String,
    token: String,
}

impl DiscordClient {
    /// Create the client from configuration.
    pub fn new(config: &DiscordConfig) -> AppResult<Self> {
        if config.token.trim().is_empty() {
            return Err(AppError::configuration("discord.token is required"));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent(concat!(
                "DiscordBot (livewatch, ",
                env!("CARGO_PKG_VERSION"),
                ")"
            ))
            .build()
            .map_err(|e| {
                AppError::with_source(ErrorKind::Configuration, "Failed to build HTTP client", e)
            })?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn member_role_path(community: CommunityId, member: MemberId, role: RoleId) -> String {
        format!("/guilds/{community}/members/{member}/roles/{role}")
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, DispatchError> {
        request
            .header("Authorization", format!("Bot {}", self.token))
            .send()
            .await
            .map_err(|e| DispatchError::Transient(format!("discord request failed: {e}")))
    }
}

/// Classify a failed Discord response.
pub fn classify_failure(status: StatusCode, body: &str) -> DispatchError {
    let message = format!("discord returned {status}: {body}");
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        DispatchError::Transient(message)
    } else {
        DispatchError::Permanent(message)
    }
}

async fn ensure_success(response: Response) -> Result<Response, DispatchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify_failure(status, &body))
}

#[async_trait]
impl ChatPlatformClient for DiscordClient {
    async fn send_notification(
        &self,
        channel: ChannelId,
        announcement: &LiveAnnouncement,
    ) -> Result<(), DispatchError> {
        let body = json!({
            "content": render_announcement(announcement),
            "allowed_mentions": { "users": [announcement.member.to_string()] },
        });
        let request = self
            .client
            .post(self.url(&format!("/channels/{channel}/messages")))
            .json(&body);
        ensure_success(self.send(request).await?).await?;
        debug!(channel = %channel, member = %announcement.member, "Posted live notification");
        Ok(())
    }

    async fn member_has_role(
        &self,
        community: CommunityId,
        member: MemberId,
        role: RoleId,
    ) -> Result<bool, DispatchError> {
        let request = self
            .client
            .get(self.url(&format!("/guilds/{community}/members/{member}")));
        let response = ensure_success(self.send(request).await?).await?;
        let member_info: GuildMember = response
            .json()
            .await
            .map_err(|e| DispatchError::Transient(format!("invalid member payload: {e}")))?;
        let role = role.to_string();
        Ok(member_info.roles.iter().any(|r| *r == role))
    }

    async fn grant_role(
        &self,
        community: CommunityId,
        member: MemberId,
        role: RoleId,
    ) -> Result<(), DispatchError> {
        let request = self
            .client
            .put(self.url(&Self::member_role_path(community, member, role)));
        ensure_success(self.send(request).await?).await?;
        debug!(community = %community, member = %member, role = %role, "Granted live role");
        Ok(())
    }

    async fn revoke_role(
        &self,
        community: CommunityId,
        member: MemberId,
        role: RoleId,
    ) -> Result<(), DispatchError> {
        let request = self
            .client
            .delete(self.url(&Self::member_role_path(community, member, role)));
        let response = self.send(request).await?;
        // A member who left the guild has no role left to revoke.
        if response.status() == StatusCode::NOT_FOUND {
            debug!(community = %community, member = %member, "Member not found on revoke");
            return Ok(());
        }
        ensure_success(response).await?;
        debug!(community = %community, member = %member, role = %role, "Revoked live role");
        Ok(())
    }
}
