//! Subjects and their platform links.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use livewatch_core::types::Platform;

use crate::presence::PresenceState;

/// A monitored channel on one platform, together with its presence state.
///
/// Keeping the state inside the link makes a second entry for the same
/// (subject, platform) pair unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformLink {
    /// Channel handle on the platform (login name, channel id, ...).
    pub handle: String,
    /// When the operator created the link.
    #[serde(default = "Utc::now")]
    pub linked_at: DateTime<Utc>,
    /// Presence state; `None` until the first successful poll.
    #[serde(default)]
    pub presence: Option<PresenceState>,
}

impl PlatformLink {
    /// Create a link that has not been polled yet.
    pub fn new(handle: impl Into<String>, linked_at: DateTime<Utc>) -> Self {
        Self {
            handle: handle.into(),
            linked_at,
            presence: None,
        }
    }

    /// Whether the link was live at its last successful check.
    pub fn is_live(&self) -> bool {
        self.presence.as_ref().is_some_and(|p| p.is_live)
    }
}

/// A monitored member and all of their platform links.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubjectRecord {
    /// Links keyed by platform; at most one per platform.
    #[serde(default)]
    pub links: BTreeMap<Platform, PlatformLink>,
}

impl SubjectRecord {
    /// Aggregate live flag: live on any linked platform.
    pub fn is_live(&self) -> bool {
        self.links.values().any(PlatformLink::is_live)
    }

    /// Presence state for one platform, if polled.
    pub fn presence(&self, platform: Platform) -> Option<&PresenceState> {
        self.links.get(&platform).and_then(|l| l.presence.as_ref())
    }

    /// A subject without links is logically deleted.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live_state() -> PresenceState {
        let now = Utc::now();
        PresenceState {
            is_live: true,
            last_title: Some("Ranked".into()),
            since: Some(now),
            last_checked_at: now,
        }
    }

    #[test]
    fn test_aggregate_live() {
        let now = Utc::now();
        let mut subject = SubjectRecord::default();
        subject
            .links
            .insert(Platform::Twitch, PlatformLink::new("alice", now));
        subject
            .links
            .insert(Platform::YouTube, PlatformLink::new("UC123", now));
        assert!(!subject.is_live());

        subject.links.get_mut(&Platform::Twitch).unwrap().presence = Some(live_state());
        assert!(subject.is_live());
        assert!(!subject.links[&Platform::YouTube].is_live());
    }
}
