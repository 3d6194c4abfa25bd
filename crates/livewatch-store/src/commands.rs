//! Operator-facing mutations of the store.
//!
//! These operations never poll a platform. The only side effect they can
//! produce is a returned [`Intent`], which is also kept as a pending role
//! change so the scheduler applies it if the caller cannot.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use livewatch_core::types::{CommunityId, MemberId, Platform};
use livewatch_entity::{CommunityConfig, Intent, PlatformLink};

use crate::error::StoreError;
use crate::store::{CommunityState, StateStore};

/// One row of [`StateStore::list_subjects`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectListing {
    /// Member the link belongs to.
    pub member: MemberId,
    /// Linked platform.
    pub platform: Platform,
    /// Channel handle on the platform.
    pub handle: String,
    /// Live at the last successful check.
    pub is_live: bool,
    /// Last seen stream title.
    pub title: Option<String>,
    /// Start of the current live session.
    pub since: Option<DateTime<Utc>>,
    /// Time of the last successful check; `None` if never polled.
    pub last_checked_at: Option<DateTime<Utc>>,
    /// When the link was created.
    pub linked_at: DateTime<Utc>,
}

impl StateStore {
    /// Link a member to a channel on one platform.
    ///
    /// Creates the community on first use. Re-adding the same handle is a
    /// no-op and returns `false`; linking a different handle on a platform
    /// that is already linked is a conflict.
    pub fn add_subject_link(
        &self,
        community: CommunityId,
        member: MemberId,
        platform: Platform,
        handle: &str,
    ) -> Result<bool, StoreError> {
        let handle = handle.trim();
        if handle.is_empty() {
            return Err(StoreError::Validation("handle must not be empty".into()));
        }

        let _gate = self.read_gate();
        let state = self.community_or_default(community);
        let mut subject = state.subjects.entry(member).or_default();

        if let Some(existing) = subject.links.get(&platform) {
            if existing.handle == handle {
                return Ok(false);
            }
            return Err(StoreError::Conflict(format!(
                "member {member} is already linked to {platform} channel '{}'",
                existing.handle
            )));
        }

        subject
            .links
            .insert(platform, PlatformLink::new(handle, Utc::now()));
        info!(
            community = %community,
            member = %member,
            platform = %platform,
            handle,
            "Added subject link"
        );
        Ok(true)
    }

    /// Remove one (member, platform) link.
    ///
    /// The member is pruned once their last link is gone. If the removed link
    /// was the member's only live one, a revoke intent is returned and
    /// recorded as the member's pending role change.
    pub fn remove_subject_link(
        &self,
        community: CommunityId,
        member: MemberId,
        platform: Platform,
    ) -> Result<Option<Intent>, StoreError> {
        let not_found = StoreError::LinkNotFound {
            community,
            member,
            platform,
        };

        let _gate = self.read_gate();
        let state = self
            .community(community)
            .ok_or(StoreError::CommunityNotFound(community))?;

        let (removed, live_elsewhere) = {
            let Some(mut subject) = state.subjects.get_mut(&member) else {
                return Err(not_found);
            };
            let Some(removed) = subject.links.remove(&platform) else {
                return Err(not_found);
            };
            (removed, subject.is_live())
        };
        state.subjects.remove_if(&member, |_, s| s.is_empty());

        info!(
            community = %community,
            member = %member,
            platform = %platform,
            handle = %removed.handle,
            "Removed subject link"
        );

        let intent = (removed.is_live() && !live_elsewhere)
            .then(|| Intent::revoke_role(community, member, platform, removed.handle));
        if let Some(intent) = &intent {
            state.pending_roles.insert(member, intent.clone());
        }
        Ok(intent)
    }

    /// Replace a community's settings, creating the community if needed.
    pub fn set_community_config(&self, community: CommunityId, config: CommunityConfig) {
        let _gate = self.read_gate();
        let state = self.community_or_default(community);
        *state.config.write().unwrap_or_else(|e| e.into_inner()) = config.clone();
        info!(
            community = %community,
            role = ?config.live_role_id.map(|r| r.get()),
            channel = ?config.notify_channel_id.map(|c| c.get()),
            backup_enabled = config.backup_enabled,
            "Updated community config"
        );
    }

    /// Current settings of a community.
    pub fn community_config(&self, community: CommunityId) -> Option<CommunityConfig> {
        self.community(community).map(|state| state.config())
    }

    /// Drop a community and all of its subjects.
    pub fn remove_community(&self, community: CommunityId) -> Result<(), StoreError> {
        let _gate = self.read_gate();
        let (_, state) = self
            .communities
            .remove(&community)
            .ok_or(StoreError::CommunityNotFound(community))?;
        info!(
            community = %community,
            subjects = state.subjects.len(),
            "Removed community"
        );
        Ok(())
    }

    /// Every link of a community, ordered by member then platform.
    pub fn list_subjects(&self, community: CommunityId) -> Vec<SubjectListing> {
        let Some(snapshot) = self.snapshot(community) else {
            return Vec::new();
        };

        snapshot
            .subjects
            .into_iter()
            .flat_map(|(member, subject)| {
                subject
                    .links
                    .into_iter()
                    .map(move |(platform, link)| SubjectListing {
                        member,
                        platform,
                        is_live: link.is_live(),
                        title: link.presence.as_ref().and_then(|p| p.last_title.clone()),
                        since: link.presence.as_ref().and_then(|p| p.since),
                        last_checked_at: link.presence.as_ref().map(|p| p.last_checked_at),
                        linked_at: link.linked_at,
                        handle: link.handle,
                    })
            })
            .collect()
    }

    fn community_or_default(&self, community: CommunityId) -> Arc<CommunityState> {
        Arc::clone(self.communities.entry(community).or_default().value())
    }
}
