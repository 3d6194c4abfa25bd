//! Startup recovery and backup behaviour of the state store.

use std::sync::Arc;

use chrono::Utc;

use livewatch_core::traits::BackupTransport;
use livewatch_core::types::{ChannelId, CommunityId, MemberId, Platform, RoleId};
use livewatch_entity::{CommunityConfig, PresenceState, StateDocument};
use livewatch_store::backup::MemoryBackupTransport;
use livewatch_store::{LoadSource, StateStore};

const C: CommunityId = CommunityId::new(1);
const M: MemberId = MemberId::new(2);

fn live(title: &str) -> PresenceState {
    let now = Utc::now();
    PresenceState {
        is_live: true,
        last_title: Some(title.into()),
        since: Some(now),
        last_checked_at: now,
    }
}

async fn open(
    dir: &std::path::Path,
    backup: Option<Arc<dyn BackupTransport>>,
) -> (StateStore, livewatch_store::RecoveryReport) {
    StateStore::open_at(dir.join("state.json"), dir.join("quarantine"), backup)
        .await
        .unwrap()
}

fn quarantine_entries(dir: &std::path::Path) -> Vec<String> {
    match std::fs::read_dir(dir.join("quarantine")) {
        Ok(entries) => entries
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect(),
        Err(_) => Vec::new(),
    }
}

#[tokio::test]
async fn test_persist_and_reload_preserves_model() {
    let dir = tempfile::tempdir().unwrap();
    let (store, report) = open(dir.path(), None).await;
    assert_eq!(report.source, LoadSource::Fresh);

    store
        .add_subject_link(C, M, Platform::Twitch, "alice")
        .unwrap();
    store
        .add_subject_link(C, M, Platform::YouTube, "UC123")
        .unwrap();
    store
        .commit_delta(C, M, Platform::Twitch, live("Ranked grind"))
        .unwrap();
    store.set_community_config(
        C,
        CommunityConfig {
            live_role_id: Some(RoleId::new(10)),
            notify_channel_id: Some(ChannelId::new(11)),
            backup_enabled: false,
        },
    );
    store.persist().await.unwrap();

    let (reloaded, report) = open(dir.path(), None).await;
    assert_eq!(report.source, LoadSource::Local);
    assert_eq!(reloaded.snapshot(C), store.snapshot(C));
    assert_eq!(reloaded.list_subjects(C), store.list_subjects(C));
}

#[tokio::test]
async fn test_corrupt_file_is_quarantined_and_store_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.json");
    std::fs::write(&state, br#"{"communities": {"1": {"subj"#).unwrap();

    let (store, report) = open(dir.path(), None).await;

    assert_eq!(report.source, LoadSource::Fresh);
    assert_eq!(report.quarantined.len(), 1);
    assert!(store.community_ids().is_empty());

    let quarantined = quarantine_entries(dir.path());
    assert_eq!(quarantined.len(), 1);
    assert!(quarantined[0].starts_with("state.corrupt-"));
    let evidence = std::fs::read(&report.quarantined[0]).unwrap();
    assert_eq!(evidence, br#"{"communities": {"1": {"subj"#);

    // The corrupt file was replaced with a valid empty document.
    let rewritten = std::fs::read(&state).unwrap();
    assert!(StateDocument::from_slice(&rewritten).is_ok());
}

#[tokio::test]
async fn test_corrupt_file_restored_from_backup() {
    let dir = tempfile::tempdir().unwrap();

    let (source, _) = open(dir.path(), None).await;
    source
        .add_subject_link(C, M, Platform::Twitch, "alice")
        .unwrap();
    let good = source.document().to_vec().unwrap();

    std::fs::write(dir.path().join("state.json"), b"\0\0\0garbage").unwrap();
    let transport = Arc::new(MemoryBackupTransport::with_latest(good));

    let (store, report) = open(dir.path(), Some(transport)).await;
    assert_eq!(report.source, LoadSource::Backup);
    assert_eq!(report.quarantined.len(), 1);
    assert_eq!(store.list_subjects(C).len(), 1);
}

#[tokio::test]
async fn test_corrupt_backup_is_quarantined_too() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(MemoryBackupTransport::with_latest(&b"not json"[..]));

    let (store, report) = open(dir.path(), Some(transport)).await;
    assert_eq!(report.source, LoadSource::Fresh);
    assert_eq!(report.quarantined.len(), 1);
    assert!(store.community_ids().is_empty());
    assert!(
        quarantine_entries(dir.path())
            .iter()
            .any(|n| n.starts_with("backup-latest.corrupt-"))
    );
}

#[tokio::test]
async fn test_backup_exports_only_opted_in_communities() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(MemoryBackupTransport::new());
    let (store, _) = open(dir.path(), Some(transport.clone())).await;

    store
        .add_subject_link(C, M, Platform::Twitch, "alice")
        .unwrap();
    assert!(store.backup().await.is_none(), "nothing opted in yet");
    assert_eq!(transport.upload_count(), 0);

    store.set_community_config(
        C,
        CommunityConfig {
            backup_enabled: true,
            ..Default::default()
        },
    );
    store
        .add_subject_link(CommunityId::new(99), M, Platform::YouTube, "UC9")
        .unwrap();

    let backup_ref = store.backup().await.unwrap();
    assert_eq!(transport.upload_count(), 1);
    assert_eq!(
        store.metadata().last_backup_at,
        Some(backup_ref.uploaded_at)
    );

    let exported = StateDocument::from_slice(&transport.latest().unwrap()).unwrap();
    assert_eq!(exported.communities.len(), 1);
    assert!(exported.communities.contains_key(&C));
}

#[tokio::test]
async fn test_failed_backup_is_swallowed() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(MemoryBackupTransport::new());
    transport.set_fail_uploads(true);
    let (store, _) = open(dir.path(), Some(transport.clone())).await;
    store.set_community_config(
        C,
        CommunityConfig {
            backup_enabled: true,
            ..Default::default()
        },
    );

    assert!(store.backup().await.is_none());
    assert!(store.metadata().last_backup_at.is_none());
    store.persist().await.unwrap();
}
