//! Transition detection.
//!
//! Pure functions: given stored presence and fresh observations, compute the
//! updated presence and the intents the change calls for. Role decisions use
//! the aggregate live flag (live on any linked platform), read from the
//! cycle's snapshot and never from a second adapter call.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use livewatch_core::types::{CommunityId, LiveStatus, MemberId, Platform};
use livewatch_entity::{Intent, PresenceState, SubjectRecord};

/// What happened to one (subject, platform) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    /// Same live flag as before.
    Unchanged,
    /// Offline → live.
    WentLive,
    /// Live → offline.
    WentOffline,
}

/// Apply one observation to the stored state.
///
/// A link that was never polled counts as offline.
pub fn apply_observation(
    old: Option<&PresenceState>,
    observed: &LiveStatus,
    now: DateTime<Utc>,
) -> (PresenceState, TransitionKind) {
    let old = old.cloned().unwrap_or_else(|| PresenceState::initial(now));

    match (old.is_live, observed.is_live) {
        (false, true) => {
            let state = PresenceState {
                is_live: true,
                last_title: observed.title.clone(),
                since: Some(now),
                last_checked_at: now,
            };
            (state, TransitionKind::WentLive)
        }
        (true, false) => {
            let state = PresenceState {
                is_live: false,
                last_title: old.last_title,
                since: None,
                last_checked_at: now,
            };
            (state, TransitionKind::WentOffline)
        }
        (true, true) => {
            let title = observed.title.clone().or(old.last_title);
            let state = PresenceState {
                is_live: true,
                last_title: title,
                since: old.since.or(Some(now)),
                last_checked_at: now,
            };
            (state, TransitionKind::Unchanged)
        }
        (false, false) => {
            let state = PresenceState {
                is_live: false,
                last_title: old.last_title,
                since: None,
                last_checked_at: now,
            };
            (state, TransitionKind::Unchanged)
        }
    }
}

/// Decision for one subject across all of its observed platforms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectOutcome {
    /// New state for every platform that was checked successfully.
    pub updates: Vec<(Platform, PresenceState)>,
    /// Notify intents first, then at most one role intent.
    pub intents: Vec<Intent>,
    /// Aggregate flag at snapshot time.
    pub live_before: bool,
    /// Aggregate flag after applying the updates. Platforms whose check
    /// failed keep their snapshot state.
    pub live_after: bool,
    /// Number of platforms whose live flag changed.
    pub transitions: usize,
}

/// Evaluate every observation for one subject in a single decision pass.
///
/// Each offline → live platform produces a Notify. The role is granted only
/// when the aggregate goes from false to true and revoked only when it goes
/// from true to false, so a subject that swaps platforms in one cycle keeps
/// its role untouched.
pub fn evaluate_subject(
    community: CommunityId,
    member: MemberId,
    subject: &SubjectRecord,
    observations: &BTreeMap<Platform, LiveStatus>,
    now: DateTime<Utc>,
) -> SubjectOutcome {
    let live_before = subject.is_live();
    let mut outcome = SubjectOutcome {
        live_before,
        ..Default::default()
    };

    let mut live_after = false;
    let mut first_live: Option<(Platform, &str)> = None;
    let mut first_offline: Option<(Platform, &str)> = None;

    for (platform, link) in &subject.links {
        let Some(observed) = observations.get(platform) else {
            live_after |= link.is_live();
            continue;
        };

        let (state, kind) = apply_observation(link.presence.as_ref(), observed, now);
        live_after |= state.is_live;

        match kind {
            TransitionKind::WentLive => {
                outcome.transitions += 1;
                outcome.intents.push(Intent::notify(
                    community,
                    member,
                    *platform,
                    link.handle.as_str(),
                    state.last_title.clone(),
                ));
                first_live.get_or_insert((*platform, link.handle.as_str()));
            }
            TransitionKind::WentOffline => {
                outcome.transitions += 1;
                first_offline.get_or_insert((*platform, link.handle.as_str()));
            }
            TransitionKind::Unchanged => {}
        }

        outcome.updates.push((*platform, state));
    }

    outcome.live_after = live_after;

    match (live_before, live_after) {
        (false, true) => {
            if let Some((platform, handle)) = first_live {
                outcome
                    .intents
                    .push(Intent::grant_role(community, member, platform, handle));
            }
        }
        (true, false) => {
            if let Some((platform, handle)) = first_offline {
                outcome
                    .intents
                    .push(Intent::revoke_role(community, member, platform, handle));
            }
        }
        _ => {}
    }

    outcome
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use livewatch_entity::{IntentKind, PlatformLink};

    use super::*;

    const C: CommunityId = CommunityId::new(1);
    const M: MemberId = MemberId::new(2);

    fn kinds(intents: &[Intent]) -> Vec<IntentKind> {
        intents.iter().map(|i| i.kind).collect()
    }

    fn live_state(at: DateTime<Utc>, title: &str) -> PresenceState {
        PresenceState {
            is_live: true,
            last_title: Some(title.into()),
            since: Some(at),
            last_checked_at: at,
        }
    }

    fn subject(links: &[(Platform, Option<PresenceState>)]) -> SubjectRecord {
        let mut subject = SubjectRecord::default();
        for (platform, presence) in links {
            let mut link = PlatformLink::new(format!("{platform}-handle"), Utc::now());
            link.presence = presence.clone();
            subject.links.insert(*platform, link);
        }
        subject
    }

    /// Evaluate a Twitch-only subject.
    fn twitch_only(
        old: Option<PresenceState>,
        observed: LiveStatus,
        now: DateTime<Utc>,
    ) -> (PresenceState, SubjectOutcome) {
        let record = subject(&[(Platform::Twitch, old)]);
        let observations = BTreeMap::from([(Platform::Twitch, observed)]);
        let outcome = evaluate_subject(C, M, &record, &observations, now);
        let state = outcome.updates[0].1.clone();
        (state, outcome)
    }

    #[test]
    fn test_first_poll_offline_creates_initial_state() {
        let now = Utc::now();
        let (state, outcome) = twitch_only(None, LiveStatus::offline(), now);
        assert_eq!(outcome.transitions, 0);
        assert!(outcome.intents.is_empty());
        assert_eq!(state, PresenceState::initial(now));
    }

    #[test]
    fn test_went_live_notifies_and_grants() {
        let now = Utc::now();
        let (state, outcome) = twitch_only(
            Some(PresenceState::initial(now)),
            LiveStatus::live(Some("Ranked".into())),
            now,
        );
        assert_eq!(outcome.transitions, 1);
        assert_eq!(
            kinds(&outcome.intents),
            vec![IntentKind::Notify, IntentKind::GrantRole]
        );
        assert_eq!(outcome.intents[0].title.as_deref(), Some("Ranked"));
        assert_eq!(outcome.intents[0].handle, "twitch-handle");
        assert_eq!(state.since, Some(now));
    }

    #[test]
    fn test_went_offline_revokes_and_keeps_title() {
        let now = Utc::now();
        let old = live_state(now - Duration::minutes(30), "Ranked");
        let (state, outcome) = twitch_only(Some(old), LiveStatus::offline(), now);

        assert_eq!(kinds(&outcome.intents), vec![IntentKind::RevokeRole]);
        assert_eq!(state.since, None);
        assert_eq!(state.last_title.as_deref(), Some("Ranked"));
    }

    #[test]
    fn test_still_live_updates_title_and_keeps_since() {
        let start = Utc::now() - Duration::hours(1);
        let now = Utc::now();
        let (state, outcome) = twitch_only(
            Some(live_state(start, "Warmup")),
            LiveStatus::live(Some("Finals".into())),
            now,
        );
        assert!(outcome.intents.is_empty());
        assert_eq!(state.since, Some(start));
        assert_eq!(state.last_title.as_deref(), Some("Finals"));
        assert_eq!(state.last_checked_at, now);
    }

    #[test]
    fn test_notify_fires_iff_previous_offline_and_current_live() {
        let observations = [
            false, true, true, false, true, false, false, true, true, true, false,
        ];
        let mut state: Option<PresenceState> = None;
        let mut previous = false;
        let mut now = Utc::now();

        for observed in observations {
            let status = if observed {
                LiveStatus::live(Some("t".into()))
            } else {
                LiveStatus::offline()
            };
            let (next, outcome) = twitch_only(state.clone(), status, now);
            let notified = outcome
                .intents
                .iter()
                .any(|i| i.kind == IntentKind::Notify);
            assert_eq!(notified, observed && !previous);
            assert!(next.is_consistent());

            previous = observed;
            state = Some(next);
            now += Duration::minutes(5);
        }
    }

    #[test]
    fn test_replayed_live_observation_notifies_once() {
        let now = Utc::now();
        let status = LiveStatus::live(Some("Ranked".into()));
        let (first_state, first) = twitch_only(None, status.clone(), now);
        let (_, second) = twitch_only(Some(first_state), status, now);
        let notifies = first
            .intents
            .iter()
            .chain(&second.intents)
            .filter(|i| i.kind == IntentKind::Notify)
            .count();
        assert_eq!(notifies, 1);
    }

    #[test]
    fn test_second_platform_going_live_only_notifies() {
        let now = Utc::now();
        let record = subject(&[
            (Platform::Twitch, Some(live_state(now, "a"))),
            (Platform::YouTube, Some(PresenceState::initial(now))),
        ]);
        let observations = BTreeMap::from([
            (Platform::Twitch, LiveStatus::live(Some("a".into()))),
            (Platform::YouTube, LiveStatus::live(Some("b".into()))),
        ]);

        let outcome = evaluate_subject(C, M, &record, &observations, now);
        assert_eq!(kinds(&outcome.intents), vec![IntentKind::Notify]);
        assert_eq!(outcome.intents[0].platform, Platform::YouTube);
    }

    #[test]
    fn test_revoke_only_when_all_platforms_offline() {
        let now = Utc::now();
        let record = subject(&[
            (Platform::Twitch, Some(live_state(now, "a"))),
            (Platform::YouTube, Some(live_state(now, "b"))),
        ]);

        let one_off = BTreeMap::from([
            (Platform::Twitch, LiveStatus::offline()),
            (Platform::YouTube, LiveStatus::live(Some("b".into()))),
        ]);
        assert!(evaluate_subject(C, M, &record, &one_off, now).intents.is_empty());

        let both_off = BTreeMap::from([
            (Platform::Twitch, LiveStatus::offline()),
            (Platform::YouTube, LiveStatus::offline()),
        ]);
        let outcome = evaluate_subject(C, M, &record, &both_off, now);
        assert_eq!(kinds(&outcome.intents), vec![IntentKind::RevokeRole]);
        assert!(!outcome.live_after);
    }

    #[test]
    fn test_failed_check_keeps_snapshot_state_in_aggregate() {
        let now = Utc::now();
        let record = subject(&[
            (Platform::Twitch, Some(live_state(now, "a"))),
            (Platform::YouTube, Some(live_state(now, "b"))),
        ]);
        // YouTube check failed, Twitch went offline: YouTube still counts as live.
        let observations = BTreeMap::from([(Platform::Twitch, LiveStatus::offline())]);

        let outcome = evaluate_subject(C, M, &record, &observations, now);
        assert!(outcome.intents.is_empty());
        assert!(outcome.live_after);
        assert_eq!(outcome.updates.len(), 1);
    }

    #[test]
    fn test_platform_swap_in_one_cycle_keeps_role() {
        let now = Utc::now();
        let record = subject(&[
            (Platform::Twitch, Some(live_state(now, "a"))),
            (Platform::YouTube, Some(PresenceState::initial(now))),
        ]);
        let observations = BTreeMap::from([
            (Platform::Twitch, LiveStatus::offline()),
            (Platform::YouTube, LiveStatus::live(Some("b".into()))),
        ]);

        let outcome = evaluate_subject(C, M, &record, &observations, now);
        assert_eq!(kinds(&outcome.intents), vec![IntentKind::Notify]);
        assert_eq!(outcome.transitions, 2);
    }

    #[test]
    fn test_grant_attached_to_first_platform_going_live() {
        let now = Utc::now();
        let record = subject(&[(Platform::Twitch, None), (Platform::YouTube, None)]);
        let observations = BTreeMap::from([
            (Platform::Twitch, LiveStatus::live(None)),
            (Platform::YouTube, LiveStatus::live(None)),
        ]);

        let outcome = evaluate_subject(C, M, &record, &observations, now);
        assert_eq!(
            kinds(&outcome.intents),
            vec![IntentKind::Notify, IntentKind::Notify, IntentKind::GrantRole]
        );
        assert_eq!(outcome.intents[2].platform, Platform::Twitch);
    }
}
