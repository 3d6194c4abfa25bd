//! The in-memory presence model and its durable persistence.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, error, info, warn};

use livewatch_core::config::StorageConfig;
use livewatch_core::traits::{BackupRef, BackupTransport};
use livewatch_core::types::{CommunityId, MemberId, Platform};
use livewatch_entity::{
    CommunityConfig, CommunityRecord, CommunitySnapshot, DocumentMetadata, Intent,
    PresenceState, StateDocument, SubjectRecord,
};

use crate::durable;
use crate::error::StoreError;
use crate::recovery::{self, RecoveryReport};

/// File name used to stage the backup export next to the state file.
const BACKUP_STAGING_FILE: &str = "backup-export.json";

/// One community's rows. Subjects live in their own map so commits for
/// different subjects never contend on the same lock.
#[derive(Debug, Default)]
pub(crate) struct CommunityState {
    pub(crate) config: RwLock<CommunityConfig>,
    pub(crate) subjects: DashMap<MemberId, SubjectRecord>,
    pub(crate) pending_roles: DashMap<MemberId, Intent>,
}

impl CommunityState {
    fn from_record(record: CommunityRecord) -> Self {
        Self {
            config: RwLock::new(record.config),
            subjects: record.subjects.into_iter().collect(),
            pending_roles: record.pending_roles.into_iter().collect(),
        }
    }

    pub(crate) fn config(&self) -> CommunityConfig {
        self.config
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn to_record(&self) -> CommunityRecord {
        CommunityRecord {
            config: self.config(),
            subjects: self
                .subjects
                .iter()
                .map(|entry| (*entry.key(), entry.value().clone()))
                .collect(),
            pending_roles: self
                .pending_roles
                .iter()
                .map(|entry| (*entry.key(), entry.value().clone()))
                .collect(),
        }
    }
}

/// Durable mapping from (community, subject, platform) to presence state.
///
/// All mutation goes through [`StateStore::commit_delta`] or the command
/// layer operations. Row mutations share the store gate; [`StateStore::persist`]
/// takes it exclusively only while copying the model out.
#[derive(Debug)]
pub struct StateStore {
    pub(crate) communities: DashMap<CommunityId, Arc<CommunityState>>,
    metadata: RwLock<DocumentMetadata>,
    gate: RwLock<()>,
    persist_lock: tokio::sync::Mutex<()>,
    state_path: PathBuf,
    backup: Option<Arc<dyn BackupTransport>>,
}

impl StateStore {
    /// Create an empty store writing to `state_path`.
    pub fn new(state_path: impl Into<PathBuf>, backup: Option<Arc<dyn BackupTransport>>) -> Self {
        Self::from_document(StateDocument::default(), state_path.into(), backup)
    }

    /// Load the store from durable storage, recovering from missing or
    /// corrupt files. A recovered or repaired model is persisted right away
    /// so the bad file is replaced before the first cycle.
    pub async fn open(
        config: &StorageConfig,
        backup: Option<Arc<dyn BackupTransport>>,
    ) -> Result<(Self, RecoveryReport), StoreError> {
        Self::open_at(config.state_path(), config.quarantine_path(), backup).await
    }

    /// Same as [`StateStore::open`] with explicit paths.
    pub async fn open_at(
        state_path: PathBuf,
        quarantine_dir: PathBuf,
        backup: Option<Arc<dyn BackupTransport>>,
    ) -> Result<(Self, RecoveryReport), StoreError> {
        let (doc, report) =
            recovery::load_or_recover(&state_path, &quarantine_dir, backup.as_deref()).await?;

        let store = Self::from_document(doc, state_path, backup);

        if report.needs_persist() {
            if let Err(e) = store.persist().await {
                error!(
                    "Failed to persist recovered state (will retry next cycle): {}",
                    e
                );
            }
        }

        info!(
            source = report.source.as_str(),
            communities = store.communities.len(),
            quarantined = report.quarantined.len(),
            "State store ready"
        );
        Ok((store, report))
    }

    fn from_document(
        doc: StateDocument,
        state_path: PathBuf,
        backup: Option<Arc<dyn BackupTransport>>,
    ) -> Self {
        let communities = doc
            .communities
            .into_iter()
            .map(|(id, record)| (id, Arc::new(CommunityState::from_record(record))))
            .collect();

        Self {
            communities,
            metadata: RwLock::new(doc.metadata),
            gate: RwLock::new(()),
            persist_lock: tokio::sync::Mutex::new(()),
            state_path,
            backup,
        }
    }

    /// Path of the durable state document.
    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    /// Current metadata block.
    pub fn metadata(&self) -> DocumentMetadata {
        self.metadata
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// All community ids, sorted.
    pub fn community_ids(&self) -> Vec<CommunityId> {
        let mut ids: Vec<CommunityId> = self.communities.iter().map(|e| *e.key()).collect();
        ids.sort();
        ids
    }

    /// Read-only copy of one community.
    pub fn snapshot(&self, community: CommunityId) -> Option<CommunitySnapshot> {
        let state = self.community(community)?;
        let record = state.to_record();
        Some(CommunitySnapshot {
            community,
            config: record.config,
            subjects: record.subjects,
            pending_roles: record.pending_roles,
        })
    }

    /// Upsert the presence state of one (subject, platform) link.
    ///
    /// Fails with [`StoreError::LinkNotFound`] if the link was removed after
    /// the cycle's snapshot was taken; the removal wins.
    pub fn commit_delta(
        &self,
        community: CommunityId,
        member: MemberId,
        platform: Platform,
        state: PresenceState,
    ) -> Result<(), StoreError> {
        let _gate = self.read_gate();
        let community_state = self
            .community(community)
            .ok_or(StoreError::CommunityNotFound(community))?;

        let mut subject =
            community_state
                .subjects
                .get_mut(&member)
                .ok_or(StoreError::LinkNotFound {
                    community,
                    member,
                    platform,
                })?;

        let link = subject
            .links
            .get_mut(&platform)
            .ok_or(StoreError::LinkNotFound {
                community,
                member,
                platform,
            })?;

        link.presence = Some(state);
        Ok(())
    }

    /// Remember a role change that still has to be applied. It replaces any
    /// earlier pending change of the same member and is persisted with the
    /// rest of the model.
    pub fn set_pending_role(&self, intent: Intent) -> Result<(), StoreError> {
        if !intent.kind.is_role() {
            return Err(StoreError::Validation(format!(
                "{} is not a role change",
                intent.kind
            )));
        }
        let _gate = self.read_gate();
        let community_state = self
            .community(intent.community)
            .ok_or(StoreError::CommunityNotFound(intent.community))?;
        community_state.pending_roles.insert(intent.member, intent);
        Ok(())
    }

    /// Forget a member's pending role change. Returns whether one existed.
    pub fn clear_pending_role(&self, community: CommunityId, member: MemberId) -> bool {
        let _gate = self.read_gate();
        self.community(community)
            .is_some_and(|state| state.pending_roles.remove(&member).is_some())
    }

    /// Number of pending role changes across all communities.
    pub fn pending_role_count(&self) -> usize {
        self.communities
            .iter()
            .map(|entry| entry.value().pending_roles.len())
            .sum()
    }

    /// Copy of the full model.
    pub fn document(&self) -> StateDocument {
        let _gate = self.write_gate();
        self.collect_document()
    }

    fn collect_document(&self) -> StateDocument {
        StateDocument {
            metadata: self.metadata(),
            communities: self
                .communities
                .iter()
                .map(|entry| (*entry.key(), entry.value().to_record()))
                .collect(),
        }
    }

    /// Flush the full model to the durable file with an atomic replace.
    pub async fn persist(&self) -> Result<(), StoreError> {
        let _persisting = self.persist_lock.lock().await;

        let bytes = {
            let _gate = self.write_gate();
            let mut doc = self.collect_document();
            doc.metadata.saved_at = Some(Utc::now());
            doc.to_vec()?
        };

        durable::write_atomic(&self.state_path, &bytes).await?;
        debug!(
            path = %self.state_path.display(),
            bytes = bytes.len(),
            "Persisted state document"
        );
        Ok(())
    }

    /// Ship the backup-enabled part of the model to the remote transport.
    ///
    /// Best-effort: failures are logged and `None` is returned.
    pub async fn backup(&self) -> Option<BackupRef> {
        let Some(transport) = self.backup.as_ref() else {
            debug!("No backup transport configured, skipping backup");
            return None;
        };

        let export = {
            let _gate = self.write_gate();
            self.collect_document().backup_export()
        };

        if export.communities.is_empty() {
            debug!("No community has backups enabled, skipping backup");
            return None;
        }

        let bytes = match export.to_vec() {
            Ok(b) => b,
            Err(e) => {
                warn!("Failed to encode backup export: {}", e);
                return None;
            }
        };

        let staging = self.state_path.with_file_name(BACKUP_STAGING_FILE);
        if let Err(e) = durable::write_atomic(&staging, &bytes).await {
            warn!("Failed to stage backup export: {}", e);
            return None;
        }

        match transport.upload(&staging).await {
            Ok(backup_ref) => {
                self.metadata
                    .write()
                    .unwrap_or_else(|e| e.into_inner())
                    .last_backup_at = Some(backup_ref.uploaded_at);
                info!(
                    transport = transport.transport_type(),
                    name = %backup_ref.name,
                    communities = export.communities.len(),
                    bytes = backup_ref.size_bytes,
                    "Backup uploaded"
                );
                Some(backup_ref)
            }
            Err(e) => {
                warn!(
                    transport = transport.transport_type(),
                    "Backup upload failed: {}", e
                );
                None
            }
        }
    }

    pub(crate) fn community(&self, community: CommunityId) -> Option<Arc<CommunityState>> {
        self.communities
            .get(&community)
            .map(|entry| Arc::clone(entry.value()))
    }

    pub(crate) fn read_gate(&self) -> RwLockReadGuard<'_, ()> {
        self.gate.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_gate(&self) -> RwLockWriteGuard<'_, ()> {
        self.gate.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use livewatch_entity::PlatformLink;

    use super::*;

    fn seeded_store(dir: &Path) -> StateStore {
        let store = StateStore::new(dir.join("state.json"), None);
        let community = Arc::new(CommunityState::default());
        let mut subject = SubjectRecord::default();
        subject
            .links
            .insert(Platform::Twitch, PlatformLink::new("alice", Utc::now()));
        community.subjects.insert(MemberId::new(7), subject);
        store.communities.insert(CommunityId::new(1), community);
        store
    }

    #[tokio::test]
    async fn test_commit_delta_upserts_single_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(dir.path());
        let now = Utc::now();

        let first = PresenceState::initial(now);
        store
            .commit_delta(CommunityId::new(1), MemberId::new(7), Platform::Twitch, first)
            .unwrap();

        let live = PresenceState {
            is_live: true,
            last_title: Some("Ranked".into()),
            since: Some(now),
            last_checked_at: now,
        };
        store
            .commit_delta(
                CommunityId::new(1),
                MemberId::new(7),
                Platform::Twitch,
                live.clone(),
            )
            .unwrap();

        let snapshot = store.snapshot(CommunityId::new(1)).unwrap();
        assert_eq!(snapshot.subjects[&MemberId::new(7)].links.len(), 1);
        assert_eq!(
            snapshot.presence(MemberId::new(7), Platform::Twitch),
            Some(&live)
        );
    }

    #[tokio::test]
    async fn test_commit_delta_for_missing_link_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(dir.path());
        let err = store
            .commit_delta(
                CommunityId::new(1),
                MemberId::new(7),
                Platform::YouTube,
                PresenceState::initial(Utc::now()),
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::LinkNotFound { .. }));
    }

    #[tokio::test]
    async fn test_snapshot_is_a_copy() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(dir.path());
        let mut snapshot = store.snapshot(CommunityId::new(1)).unwrap();
        snapshot.subjects.clear();
        assert_eq!(store.snapshot(CommunityId::new(1)).unwrap().subjects.len(), 1);
    }

    #[tokio::test]
    async fn test_persist_then_open_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(dir.path());
        let now = Utc::now();
        store
            .commit_delta(
                CommunityId::new(1),
                MemberId::new(7),
                Platform::Twitch,
                PresenceState {
                    is_live: true,
                    last_title: Some("Speedrun".into()),
                    since: Some(now),
                    last_checked_at: now,
                },
            )
            .unwrap();
        store.persist().await.unwrap();

        let (reopened, report) = StateStore::open_at(
            dir.path().join("state.json"),
            dir.path().join("quarantine"),
            None,
        )
        .await
        .unwrap();

        assert_eq!(report.source, recovery::LoadSource::Local);
        assert_eq!(
            reopened.snapshot(CommunityId::new(1)),
            store.snapshot(CommunityId::new(1))
        );
    }

    #[tokio::test]
    async fn test_pending_role_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(dir.path());
        let revoke =
            Intent::revoke_role(CommunityId::new(1), MemberId::new(7), Platform::Twitch, "alice");
        store.set_pending_role(revoke.clone()).unwrap();
        assert_eq!(store.pending_role_count(), 1);
        store.persist().await.unwrap();

        let (reopened, _) = StateStore::open_at(
            dir.path().join("state.json"),
            dir.path().join("quarantine"),
            None,
        )
        .await
        .unwrap();
        let snapshot = reopened.snapshot(CommunityId::new(1)).unwrap();
        assert_eq!(snapshot.pending_roles.get(&MemberId::new(7)), Some(&revoke));

        assert!(reopened.clear_pending_role(CommunityId::new(1), MemberId::new(7)));
        assert!(!reopened.clear_pending_role(CommunityId::new(1), MemberId::new(7)));
        assert_eq!(reopened.pending_role_count(), 0);
    }

    #[test]
    fn test_pending_role_rejects_notifications_and_unknown_communities() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(dir.path());
        let notify = Intent::notify(
            CommunityId::new(1),
            MemberId::new(7),
            Platform::Twitch,
            "alice",
            None,
        );
        assert!(matches!(
            store.set_pending_role(notify),
            Err(StoreError::Validation(_))
        ));
        let grant =
            Intent::grant_role(CommunityId::new(2), MemberId::new(7), Platform::Twitch, "alice");
        assert!(matches!(
            store.set_pending_role(grant),
            Err(StoreError::CommunityNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_commits_for_different_subjects() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(StateStore::new(dir.path().join("state.json"), None));
        let community = Arc::new(CommunityState::default());
        for member in 0..32u64 {
            let mut subject = SubjectRecord::default();
            subject.links.insert(
                Platform::Twitch,
                PlatformLink::new(format!("m{member}"), Utc::now()),
            );
            community.subjects.insert(MemberId::new(member), subject);
        }
        store.communities.insert(CommunityId::new(1), community);

        let mut handles = Vec::new();
        for member in 0..32u64 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.commit_delta(
                    CommunityId::new(1),
                    MemberId::new(member),
                    Platform::Twitch,
                    PresenceState::initial(Utc::now()),
                )
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let snapshot = store.snapshot(CommunityId::new(1)).unwrap();
        assert!(
            snapshot
                .subjects
                .values()
                .all(|s| s.presence(Platform::Twitch).is_some())
        );
    }
}
