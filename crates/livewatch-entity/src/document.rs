//! The durable state document.
//!
//! One JSON document holds every community. Unknown fields are ignored and
//! missing fields take their defaults, so older binaries can read files
//! written by newer ones and vice versa.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use livewatch_core::types::CommunityId;

use crate::community::CommunityRecord;

/// Schema version written by this build.
pub const SCHEMA_VERSION: u32 = 1;

/// Document-level metadata block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Schema version the document was written with.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Time of the last successful remote backup.
    #[serde(default)]
    pub last_backup_at: Option<DateTime<Utc>>,
    /// Time the document was written.
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}

impl DocumentMetadata {
    /// Whether the document was written less than `window` before `now`.
    /// A save time in the future counts as recent.
    pub fn saved_within(&self, now: DateTime<Utc>, window: std::time::Duration) -> bool {
        self.saved_at
            .is_some_and(|saved| (now - saved).to_std().map_or(true, |age| age < window))
    }
}

impl Default for DocumentMetadata {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION,
            last_backup_at: None,
            saved_at: None,
        }
    }
}

/// Root of the durable state file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StateDocument {
    /// Metadata block.
    #[serde(default)]
    pub metadata: DocumentMetadata,
    /// All communities keyed by id.
    #[serde(default)]
    pub communities: BTreeMap<CommunityId, CommunityRecord>,
}

impl StateDocument {
    /// Decode a document from bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Encode the document as pretty-printed JSON.
    pub fn to_vec(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }

    /// Repair what can be repaired after loading: prune subjects without
    /// links, drop pending role changes that are not role changes for their
    /// own key, and restore the `since`/`is_live` invariant. Returns the
    /// number of repairs made.
    pub fn normalize(&mut self) -> usize {
        let mut repairs = 0;
        for (community, record) in self.communities.iter_mut() {
            let before = record.subjects.len();
            record.subjects.retain(|_, subject| !subject.is_empty());
            repairs += before - record.subjects.len();

            let before = record.pending_roles.len();
            record.pending_roles.retain(|member, intent| {
                intent.kind.is_role() && intent.member == *member && intent.community == *community
            });
            repairs += before - record.pending_roles.len();

            for subject in record.subjects.values_mut() {
                for link in subject.links.values_mut() {
                    if let Some(presence) = link.presence.as_mut() {
                        if presence.normalize() {
                            repairs += 1;
                        }
                    }
                }
            }
        }
        repairs
    }

    /// Copy of the document restricted to communities that opted into
    /// remote backups.
    pub fn backup_export(&self) -> Self {
        Self {
            metadata: self.metadata.clone(),
            communities: self
                .communities
                .iter()
                .filter(|(_, record)| record.config.backup_enabled)
                .map(|(id, record)| (*id, record.clone()))
                .collect(),
        }
    }
}

fn default_version() -> u32 {
    SCHEMA_VERSION
}
