//! Hand-written fakes of the collaborator traits.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use livewatch_core::config::SchedulerConfig;
use livewatch_core::traits::{
    AdapterError, ChatPlatformClient, DispatchError, LiveAnnouncement, PlatformAdapter,
};
use livewatch_core::types::{ChannelId, CommunityId, LiveStatus, MemberId, Platform, RoleId};
use livewatch_entity::CommunityConfig;
use livewatch_platform::AdapterRegistry;
use livewatch_store::StateStore;
use livewatch_worker::{PresenceScheduler, RetryPolicy};

pub const COMMUNITY: CommunityId = CommunityId::new(1000);
pub const ROLE: RoleId = RoleId::new(77);
pub const CHANNEL: ChannelId = ChannelId::new(88);

/// What a scripted adapter answers for one handle.
#[derive(Debug, Clone)]
pub enum Reply {
    Live(&'static str),
    Offline,
    Fail(AdapterError),
    Hang,
}

#[derive(Debug)]
pub struct ScriptedAdapter {
    platform: Platform,
    replies: Mutex<HashMap<String, Reply>>,
    pub calls: AtomicUsize,
}

impl ScriptedAdapter {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            replies: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set(&self, handle: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .insert(handle.to_string(), reply);
    }
}

#[async_trait]
impl PlatformAdapter for ScriptedAdapter {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn check_live(&self, handle: &str) -> Result<LiveStatus, AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .get(handle)
            .cloned()
            .unwrap_or(Reply::Offline);
        match reply {
            Reply::Live(title) => Ok(LiveStatus::live(Some(title.to_string()))),
            Reply::Offline => Ok(LiveStatus::offline()),
            Reply::Fail(e) => Err(e),
            Reply::Hang => std::future::pending().await,
        }
    }
}

/// Role change recorded by [`FakeChat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleEvent {
    Granted(MemberId),
    Revoked(MemberId),
}

#[derive(Debug, Default)]
pub struct FakeChat {
    roles: Mutex<HashSet<MemberId>>,
    pub messages: Mutex<Vec<(ChannelId, LiveAnnouncement)>>,
    pub role_events: Mutex<Vec<RoleEvent>>,
    pub fail_roles: AtomicBool,
}

impl FakeChat {
    pub fn messages(&self) -> Vec<(ChannelId, LiveAnnouncement)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn role_events(&self) -> Vec<RoleEvent> {
        self.role_events.lock().unwrap().clone()
    }

    pub fn has_role(&self, member: MemberId) -> bool {
        self.roles.lock().unwrap().contains(&member)
    }
}

#[async_trait]
impl ChatPlatformClient for FakeChat {
    async fn send_notification(
        &self,
        channel: ChannelId,
        announcement: &LiveAnnouncement,
    ) -> Result<(), DispatchError> {
        self.messages
            .lock()
            .unwrap()
            .push((channel, announcement.clone()));
        Ok(())
    }

    async fn member_has_role(
        &self,
        _community: CommunityId,
        member: MemberId,
        _role: RoleId,
    ) -> Result<bool, DispatchError> {
        Ok(self.has_role(member))
    }

    async fn grant_role(
        &self,
        _community: CommunityId,
        member: MemberId,
        _role: RoleId,
    ) -> Result<(), DispatchError> {
        if self.fail_roles.load(Ordering::SeqCst) {
            return Err(DispatchError::Transient("503 Service Unavailable".into()));
        }
        self.roles.lock().unwrap().insert(member);
        self.role_events
            .lock()
            .unwrap()
            .push(RoleEvent::Granted(member));
        Ok(())
    }

    async fn revoke_role(
        &self,
        _community: CommunityId,
        member: MemberId,
        _role: RoleId,
    ) -> Result<(), DispatchError> {
        if self.fail_roles.load(Ordering::SeqCst) {
            return Err(DispatchError::Transient("503 Service Unavailable".into()));
        }
        self.roles.lock().unwrap().remove(&member);
        self.role_events
            .lock()
            .unwrap()
            .push(RoleEvent::Revoked(member));
        Ok(())
    }
}

pub struct Harness {
    pub dir: tempfile::TempDir,
    pub store: Arc<StateStore>,
    pub twitch: Arc<ScriptedAdapter>,
    pub youtube: Arc<ScriptedAdapter>,
    pub chat: Arc<FakeChat>,
    pub scheduler: Arc<PresenceScheduler>,
    config: SchedulerConfig,
}

impl Harness {
    pub fn state_path(&self) -> PathBuf {
        self.dir.path().join("state.json")
    }

    pub fn quarantine_dir(&self) -> PathBuf {
        self.dir.path().join("quarantine")
    }

    /// Reload the store from disk and build a new scheduler around it, as a
    /// process restart does. Adapters and the chat fake are kept.
    pub async fn restart(&mut self) {
        let (store, _) = StateStore::open_at(self.state_path(), self.quarantine_dir(), None)
            .await
            .unwrap();
        self.store = Arc::new(store);
        self.scheduler = self.build_scheduler();
    }

    fn build_scheduler(&self) -> Arc<PresenceScheduler> {
        let mut adapters = AdapterRegistry::new();
        adapters.register(self.twitch.clone());
        adapters.register(self.youtube.clone());
        Arc::new(PresenceScheduler::new(
            Arc::clone(&self.store),
            adapters,
            self.chat.clone(),
            self.config.clone(),
            RetryPolicy::no_retry(),
        ))
    }
}

pub fn scheduler_config() -> SchedulerConfig {
    SchedulerConfig {
        poll_interval_seconds: 1,
        cycle_timeout_seconds: 1,
        concurrency: 4,
        shutdown_grace_seconds: 5,
        ..Default::default()
    }
}

pub fn harness() -> Harness {
    harness_with(scheduler_config())
}

pub fn harness_with(config: SchedulerConfig) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(StateStore::new(dir.path().join("state.json"), None));
    store.set_community_config(
        COMMUNITY,
        CommunityConfig {
            live_role_id: Some(ROLE),
            notify_channel_id: Some(CHANNEL),
            backup_enabled: false,
        },
    );

    let twitch = Arc::new(ScriptedAdapter::new(Platform::Twitch));
    let youtube = Arc::new(ScriptedAdapter::new(Platform::YouTube));
    let chat = Arc::new(FakeChat::default());

    let mut adapters = AdapterRegistry::new();
    adapters.register(twitch.clone());
    adapters.register(youtube.clone());
    let scheduler = Arc::new(PresenceScheduler::new(
        Arc::clone(&store),
        adapters,
        chat.clone(),
        config.clone(),
        RetryPolicy::no_retry(),
    ));

    Harness {
        dir,
        store,
        twitch,
        youtube,
        chat,
        scheduler,
        config,
    }
}
