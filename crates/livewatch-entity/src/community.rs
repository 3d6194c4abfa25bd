//! Communities and their per-cycle snapshots.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use livewatch_core::types::{ChannelId, CommunityId, MemberId, Platform, RoleId};

use crate::intent::Intent;
use crate::presence::PresenceState;
use crate::subject::SubjectRecord;

/// Operator-supplied settings for one community.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommunityConfig {
    /// Role granted while a subject is live.
    #[serde(default)]
    pub live_role_id: Option<RoleId>,
    /// Channel that receives live notifications.
    #[serde(default)]
    pub notify_channel_id: Option<ChannelId>,
    /// Whether this community is included in remote backups.
    #[serde(default)]
    pub backup_enabled: bool,
}

/// Everything stored for one community.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommunityRecord {
    /// Community settings.
    #[serde(default)]
    pub config: CommunityConfig,
    /// Subjects keyed by member.
    #[serde(default)]
    pub subjects: BTreeMap<MemberId, SubjectRecord>,
    /// Role changes that still have to be applied, at most one per member.
    /// The member may no longer be monitored.
    #[serde(default)]
    pub pending_roles: BTreeMap<MemberId, Intent>,
}

/// Read-only copy of one community taken at the start of a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommunitySnapshot {
    /// The community this snapshot belongs to.
    pub community: CommunityId,
    /// Community settings at snapshot time.
    pub config: CommunityConfig,
    /// Subjects at snapshot time.
    pub subjects: BTreeMap<MemberId, SubjectRecord>,
    /// Outstanding role changes at snapshot time.
    pub pending_roles: BTreeMap<MemberId, Intent>,
}

impl CommunitySnapshot {
    /// Presence of one (subject, platform) pair, if it has been polled.
    pub fn presence(&self, member: MemberId, platform: Platform) -> Option<&PresenceState> {
        self.subjects.get(&member).and_then(|s| s.presence(platform))
    }
}
