//! Intent execution against the chat platform.

use std::sync::Arc;

use livewatch_core::traits::{ChatPlatformClient, DispatchError, LiveAnnouncement};
use livewatch_entity::{CommunityConfig, Intent, IntentKind};

/// How an intent was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchStatus {
    /// The side effect was performed.
    Applied,
    /// The member already had the desired role state; nothing was changed.
    AlreadyApplied,
    /// The community has no channel or role configured for this intent.
    Skipped(&'static str),
}

/// Result of one intent.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    /// The intent that was executed.
    pub intent: Intent,
    /// What happened.
    pub result: Result<DispatchStatus, DispatchError>,
}

impl DispatchOutcome {
    /// Whether the intent failed.
    pub fn is_failure(&self) -> bool {
        self.result.is_err()
    }
}

/// Outcomes of every intent dispatched in one batch.
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    /// One entry per intent, in dispatch order.
    pub outcomes: Vec<DispatchOutcome>,
}

impl DispatchReport {
    /// Intents whose side effect ran or was already in place.
    pub fn applied(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| {
                matches!(
                    o.result,
                    Ok(DispatchStatus::Applied | DispatchStatus::AlreadyApplied)
                )
            })
            .count()
    }

    /// Intents skipped for missing configuration.
    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.result, Ok(DispatchStatus::Skipped(_))))
            .count()
    }

    /// Intents that failed.
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }
}

/// Executes intents one by one; a failure never blocks the next intent.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    chat: Arc<dyn ChatPlatformClient>,
}

impl Dispatcher {
    /// Create a dispatcher for the given chat client.
    pub fn new(chat: Arc<dyn ChatPlatformClient>) -> Self {
        Self { chat }
    }

    /// Execute every intent in order.
    pub async fn dispatch_all(&self, config: &CommunityConfig, intents: &[Intent]) -> DispatchReport {
        let mut report = DispatchReport::default();
        for intent in intents {
            let result = self.dispatch(config, intent).await;
            if let Err(e) = &result {
                tracing::warn!(
                    community = %intent.community,
                    member = %intent.member,
                    platform = %intent.platform,
                    kind = %intent.kind,
                    "Intent failed: {}",
                    e
                );
            }
            report.outcomes.push(DispatchOutcome {
                intent: intent.clone(),
                result,
            });
        }
        report
    }

    /// Execute one intent.
    ///
    /// Role intents check membership first, so a replayed intent never
    /// toggles the role twice.
    pub async fn dispatch(
        &self,
        config: &CommunityConfig,
        intent: &Intent,
    ) -> Result<DispatchStatus, DispatchError> {
        match intent.kind {
            IntentKind::Notify => {
                let Some(channel) = config.notify_channel_id else {
                    tracing::debug!(community = %intent.community, "No notify channel configured");
                    return Ok(DispatchStatus::Skipped("no notify channel configured"));
                };
                let announcement = LiveAnnouncement {
                    member: intent.member,
                    platform: intent.platform,
                    handle: intent.handle.clone(),
                    title: intent.title.clone(),
                };
                self.chat.send_notification(channel, &announcement).await?;
                tracing::info!(
                    community = %intent.community,
                    member = %intent.member,
                    platform = %intent.platform,
                    "Sent live notification"
                );
                Ok(DispatchStatus::Applied)
            }
            IntentKind::GrantRole | IntentKind::RevokeRole => {
                let Some(role) = config.live_role_id else {
                    tracing::debug!(community = %intent.community, "No live role configured");
                    return Ok(DispatchStatus::Skipped("no live role configured"));
                };
                let grant = intent.kind == IntentKind::GrantRole;
                let has_role = self
                    .chat
                    .member_has_role(intent.community, intent.member, role)
                    .await?;

                if has_role == grant {
                    tracing::debug!(
                        community = %intent.community,
                        member = %intent.member,
                        kind = %intent.kind,
                        "Role already in desired state"
                    );
                    return Ok(DispatchStatus::AlreadyApplied);
                }

                if grant {
                    self.chat
                        .grant_role(intent.community, intent.member, role)
                        .await?;
                } else {
                    self.chat
                        .revoke_role(intent.community, intent.member, role)
                        .await?;
                }
                tracing::info!(
                    community = %intent.community,
                    member = %intent.member,
                    kind = %intent.kind,
                    "Updated live role"
                );
                Ok(DispatchStatus::Applied)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use livewatch_core::types::{ChannelId, CommunityId, MemberId, Platform, RoleId};

    use super::*;

    #[derive(Debug, Default)]
    struct FakeChat {
        roles: Mutex<HashSet<MemberId>>,
        messages: Mutex<Vec<(ChannelId, LiveAnnouncement)>>,
        role_calls: Mutex<usize>,
        fail_messages: bool,
    }

    #[async_trait]
    impl ChatPlatformClient for FakeChat {
        async fn send_notification(
            &self,
            channel: ChannelId,
            announcement: &LiveAnnouncement,
        ) -> Result<(), DispatchError> {
            if self.fail_messages {
                return Err(DispatchError::Transient("503".into()));
            }
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
            Ok(self.roles.lock().unwrap().contains(&member))
        }

        async fn grant_role(
            &self,
            _community: CommunityId,
            member: MemberId,
            _role: RoleId,
        ) -> Result<(), DispatchError> {
            *self.role_calls.lock().unwrap() += 1;
            self.roles.lock().unwrap().insert(member);
            Ok(())
        }

        async fn revoke_role(
            &self,
            _community: CommunityId,
            member: MemberId,
            _role: RoleId,
        ) -> Result<(), DispatchError> {
            *self.role_calls.lock().unwrap() += 1;
            self.roles.lock().unwrap().remove(&member);
            Ok(())
        }
    }

    const C: CommunityId = CommunityId::new(1);
    const M: MemberId = MemberId::new(2);

    fn configured() -> CommunityConfig {
        CommunityConfig {
            live_role_id: Some(RoleId::new(3)),
            notify_channel_id: Some(ChannelId::new(4)),
            backup_enabled: false,
        }
    }

    #[tokio::test]
    async fn test_grant_is_idempotent() {
        let chat = Arc::new(FakeChat::default());
        let dispatcher = Dispatcher::new(chat.clone());
        let grant = Intent::grant_role(C, M, Platform::Twitch, "alice");

        assert_eq!(
            dispatcher.dispatch(&configured(), &grant).await,
            Ok(DispatchStatus::Applied)
        );
        assert_eq!(
            dispatcher.dispatch(&configured(), &grant).await,
            Ok(DispatchStatus::AlreadyApplied)
        );
        assert_eq!(*chat.role_calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_revoke_without_role_is_noop() {
        let chat = Arc::new(FakeChat::default());
        let dispatcher = Dispatcher::new(chat.clone());
        let revoke = Intent::revoke_role(C, M, Platform::Twitch, "alice");
        assert_eq!(
            dispatcher.dispatch(&configured(), &revoke).await,
            Ok(DispatchStatus::AlreadyApplied)
        );
        assert_eq!(*chat.role_calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unconfigured_community_skips() {
        let dispatcher = Dispatcher::new(Arc::new(FakeChat::default()));
        let config = CommunityConfig::default();
        let report = dispatcher
            .dispatch_all(
                &config,
                &[
                    Intent::notify(C, M, Platform::Twitch, "alice", None),
                    Intent::grant_role(C, M, Platform::Twitch, "alice"),
                ],
            )
            .await;
        assert_eq!(report.skipped(), 2);
        assert_eq!(report.failed(), 0);
    }

    #[tokio::test]
    async fn test_failure_does_not_block_remaining_intents() {
        let chat = Arc::new(FakeChat {
            fail_messages: true,
            ..Default::default()
        });
        let dispatcher = Dispatcher::new(chat.clone());
        let report = dispatcher
            .dispatch_all(
                &configured(),
                &[
                    Intent::notify(C, M, Platform::Twitch, "alice", Some("Ranked".into())),
                    Intent::grant_role(C, M, Platform::Twitch, "alice"),
                ],
            )
            .await;
        assert_eq!(report.failed(), 1);
        assert_eq!(report.applied(), 1);
        assert!(chat.roles.lock().unwrap().contains(&M));
    }
}
