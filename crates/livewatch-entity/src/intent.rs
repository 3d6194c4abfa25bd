//! Side-effect intents produced by transition detection.

use serde::{Deserialize, Serialize};

use livewatch_core::types::{CommunityId, MemberId, Platform};

/// What a chat-platform side effect should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    /// Announce a new live session.
    Notify,
    /// Give the member the community's live role.
    GrantRole,
    /// Take the community's live role away.
    RevokeRole,
}

impl IntentKind {
    /// Whether this intent manages the live role.
    pub fn is_role(&self) -> bool {
        matches!(self, Self::GrantRole | Self::RevokeRole)
    }

    /// Return the kind as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Notify => "notify",
            Self::GrantRole => "grant_role",
            Self::RevokeRole => "revoke_role",
        }
    }
}

impl std::fmt::Display for IntentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One side effect to execute against the chat platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    /// What to do.
    pub kind: IntentKind,
    /// Community the subject belongs to.
    pub community: CommunityId,
    /// Subject the intent is about.
    pub member: MemberId,
    /// Platform whose transition produced the intent.
    pub platform: Platform,
    /// Channel handle on that platform.
    pub handle: String,
    /// Stream title (notifications only).
    pub title: Option<String>,
}

impl Intent {
    /// Build a live notification intent.
    pub fn notify(
        community: CommunityId,
        member: MemberId,
        platform: Platform,
        handle: impl Into<String>,
        title: Option<String>,
    ) -> Self {
        Self {
            kind: IntentKind::Notify,
            community,
            member,
            platform,
            handle: handle.into(),
            title,
        }
    }

    /// Build a role grant intent.
    pub fn grant_role(
        community: CommunityId,
        member: MemberId,
        platform: Platform,
        handle: impl Into<String>,
    ) -> Self {
        Self {
            kind: IntentKind::GrantRole,
            community,
            member,
            platform,
            handle: handle.into(),
            title: None,
        }
    }

    /// Build a role revoke intent.
    pub fn revoke_role(
        community: CommunityId,
        member: MemberId,
        platform: Platform,
        handle: impl Into<String>,
    ) -> Self {
        Self {
            kind: IntentKind::RevokeRole,
            community,
            member,
            platform,
            handle: handle.into(),
            title: None,
        }
    }
}
