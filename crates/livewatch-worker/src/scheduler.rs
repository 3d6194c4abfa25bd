//! Periodic polling driver.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use tokio::sync::{Semaphore, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, Instant, MissedTickBehavior};

use livewatch_core::config::SchedulerConfig;
use livewatch_core::result::AppResult;
use livewatch_core::traits::ChatPlatformClient;
use livewatch_core::types::{CommunityId, LiveStatus, MemberId, Platform};
use livewatch_entity::{CommunitySnapshot, PresenceState};
use livewatch_platform::AdapterRegistry;
use livewatch_store::{StateStore, StoreError};

use crate::detector::evaluate_subject;
use crate::dispatcher::{DispatchOutcome, Dispatcher};
use crate::reconcile::RoleReconciler;
use crate::report::CycleReport;
use crate::retry::RetryPolicy;

type Observations = HashMap<MemberId, BTreeMap<Platform, LiveStatus>>;

/// Whether a cycle is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Waiting for the next tick.
    Idle,
    /// A cycle is running.
    Running,
}

/// Resets the running flag when a cycle ends, even if it was aborted.
#[derive(Debug)]
struct CycleGuard(Arc<AtomicBool>);

impl Drop for CycleGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Runs polling cycles over every community in the store.
///
/// One cycle: for each community in turn, check every linked channel through
/// its platform adapter (bounded concurrency), decide transitions for all
/// subjects at once, commit them, then execute the resulting intents. The
/// store is persisted once at the end. Cycles never overlap.
#[derive(Debug)]
pub struct PresenceScheduler {
    store: Arc<StateStore>,
    adapters: AdapterRegistry,
    dispatcher: Dispatcher,
    reconciler: RoleReconciler,
    retry: RetryPolicy,
    config: SchedulerConfig,
    running: Arc<AtomicBool>,
}

impl PresenceScheduler {
    /// Create a new scheduler
    pub fn new(
        store: Arc<StateStore>,
        adapters: AdapterRegistry,
        chat: Arc<dyn ChatPlatformClient>,
        config: SchedulerConfig,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            reconciler: RoleReconciler::new(Arc::clone(&store)),
            store,
            adapters,
            dispatcher: Dispatcher::new(chat),
            retry,
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The store this scheduler drives.
    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    /// Current state.
    pub fn state(&self) -> SchedulerState {
        if self.running.load(Ordering::SeqCst) {
            SchedulerState::Running
        } else {
            SchedulerState::Idle
        }
    }

    /// Role changes waiting to be applied.
    pub fn pending_role_changes(&self) -> usize {
        self.reconciler.pending_count()
    }

    fn begin_cycle(&self) -> Option<CycleGuard> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| CycleGuard(Arc::clone(&self.running)))
    }

    /// Run one cycle now, unless one is already running.
    pub async fn try_run_cycle(&self) -> Option<CycleReport> {
        let Some(_guard) = self.begin_cycle() else {
            tracing::warn!("Previous cycle still running, skipping");
            return None;
        };
        Some(self.execute_cycle().await)
    }

    /// Tick every poll interval until shutdown is signalled, then wait
    /// (bounded) for the in-flight cycle.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            "Presence scheduler started with poll_interval={}s, cycle_timeout={}s, concurrency={}, platforms={:?}",
            self.config.poll_interval().as_secs(),
            self.config.cycle_timeout().as_secs(),
            self.config.concurrency,
            self.adapters.platforms()
        );

        let mut ticker = time::interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut in_flight: Option<JoinHandle<()>> = None;

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("Presence scheduler received shutdown signal");
                        break;
                    }
                }
                _ = ticker.tick() => {
                    match self.begin_cycle() {
                        Some(guard) => {
                            let this = Arc::clone(&self);
                            in_flight = Some(tokio::spawn(async move {
                                let _guard = guard;
                                this.execute_cycle().await;
                            }));
                        }
                        None => tracing::warn!("Previous cycle still running, skipping tick"),
                    }
                }
            }
        }

        if let Some(mut handle) = in_flight.filter(|h| !h.is_finished()) {
            let grace = std::time::Duration::from_secs(self.config.shutdown_grace_seconds);
            tracing::info!("Waiting up to {}s for in-flight cycle to finish", grace.as_secs());
            if time::timeout(grace, &mut handle).await.is_err() {
                tracing::warn!("In-flight cycle did not finish in time, aborting it");
                handle.abort();
            }
        }

        tracing::info!("Presence scheduler stopped");
    }

    async fn execute_cycle(&self) -> CycleReport {
        let started = Instant::now();
        let deadline = started + self.config.cycle_timeout();
        let mut report = CycleReport::default();

        for community in self.store.community_ids() {
            if Instant::now() >= deadline {
                tracing::warn!(
                    "Cycle deadline reached; remaining communities are checked next cycle"
                );
                break;
            }
            self.process_community(community, deadline, &mut report)
                .await;
        }

        report.persisted = match self.store.persist().await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    "Failed to persist state, keeping in-memory state until next cycle: {}",
                    e
                );
                false
            }
        };
        report.duration = started.elapsed();

        tracing::info!(
            communities = report.communities,
            checks = report.checks,
            failed_checks = report.failed_checks,
            transitions = report.transitions,
            intents = report.intents(),
            intents_failed = report.intents_failed,
            persisted = report.persisted,
            duration_ms = report.duration.as_millis() as u64,
            "Polling cycle complete"
        );
        report
    }

    async fn process_community(
        &self,
        community: CommunityId,
        deadline: Instant,
        report: &mut CycleReport,
    ) {
        let Some(snapshot) = self.store.snapshot(community) else {
            return;
        };
        report.communities += 1;

        let observations = self.check_links(&snapshot, deadline, report).await;
        let now = Utc::now();
        let mut intents = Vec::new();
        self.reconciler.unmonitored(&snapshot, &mut intents);

        for (member, subject) in &snapshot.subjects {
            let Some(observed) = observations.get(member) else {
                continue;
            };
            let mut outcome = evaluate_subject(community, *member, subject, observed, now);
            if !self.commit(community, *member, &outcome.updates) {
                continue;
            }
            report.transitions += outcome.transitions;
            self.reconciler
                .reconcile(&snapshot, *member, outcome.live_after, &mut outcome.intents);
            intents.extend(outcome.intents);
        }

        if intents.is_empty() {
            return;
        }

        let dispatched = self.dispatcher.dispatch_all(&snapshot.config, &intents).await;
        self.reconciler.record(&dispatched.outcomes);
        report.add_dispatch(&dispatched);
    }

    /// Check every link of the snapshot. Links whose check fails are absent
    /// from the result.
    async fn check_links(
        &self,
        snapshot: &CommunitySnapshot,
        deadline: Instant,
        report: &mut CycleReport,
    ) -> Observations {
        let community = snapshot.community;
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (member, subject) in &snapshot.subjects {
            for (platform, link) in &subject.links {
                let Some(adapter) = self.adapters.get(*platform) else {
                    tracing::trace!(
                        community = %community,
                        member = %member,
                        platform = %platform,
                        "No adapter registered, skipping link"
                    );
                    report.unsupported_links += 1;
                    continue;
                };

                report.checks += 1;
                let permit =
                    match time::timeout_at(deadline, Arc::clone(&semaphore).acquire_owned()).await
                    {
                        Ok(Ok(permit)) => permit,
                        _ => {
                            report.failed_checks += 1;
                            continue;
                        }
                    };

                let retry = self.retry.clone();
                let handle = link.handle.clone();
                let (member, platform) = (*member, *platform);
                tasks.spawn(async move {
                    let _permit = permit;
                    let result = retry.run(deadline, || adapter.check_live(&handle)).await;
                    (member, platform, handle, result)
                });
            }
        }

        let mut observations = Observations::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((member, platform, _, Ok(status))) => {
                    observations
                        .entry(member)
                        .or_default()
                        .insert(platform, status);
                }
                Ok((member, platform, handle, Err(e))) => {
                    report.failed_checks += 1;
                    tracing::warn!(
                        community = %community,
                        member = %member,
                        platform = %platform,
                        handle = %handle,
                        "Live check failed, keeping previous state: {}",
                        e
                    );
                }
                Err(e) => {
                    report.failed_checks += 1;
                    tracing::error!(community = %community, "Live check task failed: {}", e);
                }
            }
        }
        observations
    }

    /// Commit one subject's updates. Returns `false` if the subject's
    /// decisions must be dropped because its link disappeared mid-cycle.
    fn commit(
        &self,
        community: CommunityId,
        member: MemberId,
        updates: &[(Platform, PresenceState)],
    ) -> bool {
        for (platform, state) in updates {
            match self
                .store
                .commit_delta(community, member, *platform, state.clone())
            {
                Ok(()) => {}
                Err(e @ (StoreError::LinkNotFound { .. } | StoreError::CommunityNotFound(_))) => {
                    tracing::debug!("Dropping decision for link removed during cycle: {}", e);
                    return false;
                }
                Err(e) => {
                    tracing::error!(
                        community = %community,
                        member = %member,
                        "Failed to commit presence update: {}",
                        e
                    );
                    return false;
                }
            }
        }
        true
    }

    /// Remove a link and immediately revoke the live role if it was the
    /// subject's only live platform. A revoke that fails stays pending and is
    /// retried by later cycles.
    pub async fn remove_link_and_sync(
        &self,
        community: CommunityId,
        member: MemberId,
        platform: Platform,
    ) -> AppResult<Option<DispatchOutcome>> {
        let intent = self
            .store
            .remove_subject_link(community, member, platform)?;

        let Some(intent) = intent else {
            self.persist_after("link removal").await;
            return Ok(None);
        };

        let config = self.store.community_config(community).unwrap_or_default();
        let result = self.dispatcher.dispatch(&config, &intent).await;
        if let Err(e) = &result {
            tracing::warn!(
                community = %community,
                member = %member,
                "Revoke after link removal failed: {}",
                e
            );
        }
        let outcome = DispatchOutcome { intent, result };
        self.reconciler.record(std::slice::from_ref(&outcome));
        self.persist_after("link removal").await;
        Ok(Some(outcome))
    }

    /// Drop a community together with its pending role changes.
    pub async fn remove_community(&self, community: CommunityId) -> AppResult<()> {
        self.store.remove_community(community)?;
        self.persist_after("community removal").await;
        Ok(())
    }

    async fn persist_after(&self, operation: &str) {
        if let Err(e) = self.store.persist().await {
            tracing::error!("Failed to persist {}: {}", operation, e);
        }
    }
}
