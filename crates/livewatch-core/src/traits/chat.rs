//! Chat platform client trait.

use async_trait::async_trait;
use thiserror::Error;

use crate::error::{AppError, ErrorKind};
use crate::types::{ChannelId, CommunityId, MemberId, Platform, RoleId};

/// Failure of a single chat-platform side effect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// May succeed if retried later (rate limit, 5xx, network).
    #[error("transient dispatch failure: {0}")]
    Transient(String),

    /// Will not succeed without operator action (missing permission,
    /// unknown channel/role/member).
    #[error("permanent dispatch failure: {0}")]
    Permanent(String),
}

impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        let message = err.to_string();
        AppError::with_source(ErrorKind::Dispatch, message, err)
    }
}

/// Content of one "went live" notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveAnnouncement {
    /// Member who went live.
    pub member: MemberId,
    /// Platform the stream started on.
    pub platform: Platform,
    /// Channel handle on that platform.
    pub handle: String,
    /// Stream title, if known.
    pub title: Option<String>,
}

/// Side effects the engine drives on the chat platform.
#[async_trait]
pub trait ChatPlatformClient: Send + Sync + std::fmt::Debug + 'static {
    /// Post a live notification into a channel.
    async fn send_notification(
        &self,
        channel: ChannelId,
        announcement: &LiveAnnouncement,
    ) -> Result<(), DispatchError>;

    /// Whether the member currently holds the role.
    async fn member_has_role(
        &self,
        community: CommunityId,
        member: MemberId,
        role: RoleId,
    ) -> Result<bool, DispatchError>;

    /// Add the role to the member.
    async fn grant_role(
        &self,
        community: CommunityId,
        member: MemberId,
        role: RoleId,
    ) -> Result<(), DispatchError>;

    /// Remove the role from the member.
    async fn revoke_role(
        &self,
        community: CommunityId,
        member: MemberId,
        role: RoleId,
    ) -> Result<(), DispatchError>;
}
