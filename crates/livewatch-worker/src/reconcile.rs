//! Re-issuing role changes that have not been applied yet.

use std::sync::Arc;

use livewatch_core::types::MemberId;
use livewatch_entity::{CommunitySnapshot, Intent, IntentKind};
use livewatch_store::StateStore;

use crate::dispatcher::DispatchOutcome;

/// Keeps role intents that still have to be applied as pending role changes
/// in the store, so they survive a restart.
///
/// A change becomes pending when its dispatch fails or when an operator
/// removes a member's only live link. Later cycles replay it for as long as
/// the member's aggregate still calls for it. The membership check in the
/// dispatcher makes the replay safe.
#[derive(Debug)]
pub struct RoleReconciler {
    store: Arc<StateStore>,
}

impl RoleReconciler {
    /// Create a reconciler backed by `store`.
    pub fn new(store: Arc<StateStore>) -> Self {
        Self { store }
    }

    /// Fold a member's pending role change into their fresh intents.
    ///
    /// A fresh role intent supersedes the pending one. Otherwise the pending
    /// intent is replayed if `live_now` still matches it, and dropped if not.
    pub fn reconcile(
        &self,
        snapshot: &CommunitySnapshot,
        member: MemberId,
        live_now: bool,
        intents: &mut Vec<Intent>,
    ) {
        let Some(pending) = snapshot.pending_roles.get(&member) else {
            return;
        };

        if intents.iter().any(|i| i.kind.is_role()) {
            return;
        }

        let still_wanted = match pending.kind {
            IntentKind::GrantRole => live_now,
            IntentKind::RevokeRole => !live_now,
            IntentKind::Notify => false,
        };
        if still_wanted {
            tracing::info!(
                community = %snapshot.community,
                member = %member,
                kind = %pending.kind,
                "Re-issuing pending role change"
            );
            intents.push(pending.clone());
        } else {
            self.store.clear_pending_role(snapshot.community, member);
        }
    }

    /// Handle pending role changes of members that are no longer monitored.
    /// Revokes are replayed since no later transition will issue them again;
    /// grants are dropped.
    pub fn unmonitored(&self, snapshot: &CommunitySnapshot, intents: &mut Vec<Intent>) {
        for (member, pending) in &snapshot.pending_roles {
            if snapshot.subjects.contains_key(member) {
                continue;
            }
            if pending.kind == IntentKind::RevokeRole {
                tracing::info!(
                    community = %snapshot.community,
                    member = %member,
                    "Re-issuing revoke for unlinked member"
                );
                intents.push(pending.clone());
            } else {
                self.store.clear_pending_role(snapshot.community, *member);
            }
        }
    }

    /// Record dispatch results: failed role intents become pending, applied
    /// ones clear any pending entry.
    pub fn record(&self, outcomes: &[DispatchOutcome]) {
        for outcome in outcomes.iter().filter(|o| o.intent.kind.is_role()) {
            let intent = &outcome.intent;
            if !outcome.is_failure() {
                self.store.clear_pending_role(intent.community, intent.member);
            } else if let Err(e) = self.store.set_pending_role(intent.clone()) {
                tracing::debug!(
                    community = %intent.community,
                    member = %intent.member,
                    "Dropping failed role change: {}",
                    e
                );
            }
        }
    }

    /// Number of pending role changes.
    pub fn pending_count(&self) -> usize {
        self.store.pending_role_count()
    }
}

#[cfg(test)]
mod tests {
    use livewatch_core::traits::DispatchError;
    use livewatch_core::types::{CommunityId, Platform};

    use super::*;
    use crate::dispatcher::DispatchStatus;

    const C: CommunityId = CommunityId::new(1);
    const M: MemberId = MemberId::new(2);

    fn reconciler() -> (tempfile::TempDir, RoleReconciler) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(StateStore::new(dir.path().join("state.json"), None));
        store.add_subject_link(C, M, Platform::Twitch, "a").unwrap();
        (dir, RoleReconciler::new(store))
    }

    fn snapshot(reconciler: &RoleReconciler) -> CommunitySnapshot {
        reconciler.store.snapshot(C).unwrap()
    }

    fn failed(intent: Intent) -> DispatchOutcome {
        DispatchOutcome {
            intent,
            result: Err(DispatchError::Transient("503".into())),
        }
    }

    fn applied(intent: Intent) -> DispatchOutcome {
        DispatchOutcome {
            intent,
            result: Ok(DispatchStatus::Applied),
        }
    }

    #[test]
    fn test_failed_revoke_is_replayed_until_applied() {
        let (_dir, reconciler) = reconciler();
        let revoke = Intent::revoke_role(C, M, Platform::Twitch, "a");
        reconciler.record(&[failed(revoke.clone())]);

        let mut intents = Vec::new();
        reconciler.reconcile(&snapshot(&reconciler), M, false, &mut intents);
        assert_eq!(intents, vec![revoke.clone()]);
        assert_eq!(reconciler.pending_count(), 1);

        reconciler.record(&[applied(revoke)]);
        assert_eq!(reconciler.pending_count(), 0);
    }

    #[test]
    fn test_pending_dropped_when_aggregate_changed() {
        let (_dir, reconciler) = reconciler();
        reconciler.record(&[failed(Intent::grant_role(C, M, Platform::Twitch, "a"))]);

        let mut intents = Vec::new();
        reconciler.reconcile(&snapshot(&reconciler), M, false, &mut intents);
        assert!(intents.is_empty());
        assert_eq!(reconciler.pending_count(), 0);
    }

    #[test]
    fn test_fresh_role_intent_supersedes_pending() {
        let (_dir, reconciler) = reconciler();
        reconciler.record(&[failed(Intent::grant_role(C, M, Platform::Twitch, "a"))]);

        let mut intents = vec![Intent::revoke_role(C, M, Platform::Twitch, "a")];
        reconciler.reconcile(&snapshot(&reconciler), M, false, &mut intents);
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].kind, IntentKind::RevokeRole);
    }

    #[test]
    fn test_unmonitored_members_keep_revokes_only() {
        let (_dir, reconciler) = reconciler();
        let gone_live = MemberId::new(3);
        let gone_offline = MemberId::new(4);
        let revoke = Intent::revoke_role(C, gone_live, Platform::Twitch, "b");
        reconciler.record(&[
            failed(revoke.clone()),
            failed(Intent::grant_role(C, gone_offline, Platform::YouTube, "UCc")),
        ]);
        assert_eq!(reconciler.pending_count(), 2);

        let mut intents = Vec::new();
        reconciler.unmonitored(&snapshot(&reconciler), &mut intents);
        assert_eq!(intents, vec![revoke]);
        assert_eq!(reconciler.pending_count(), 1);
    }

    #[test]
    fn test_failure_for_removed_community_is_dropped() {
        let (_dir, reconciler) = reconciler();
        let other = CommunityId::new(9);
        reconciler.record(&[failed(Intent::revoke_role(other, M, Platform::Twitch, "a"))]);
        assert_eq!(reconciler.pending_count(), 0);
    }
}
