//! Membership gate: the fate of newly joined participants.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::database::{ActionKind, ConversationPolicy};
use crate::utils::apply_welcome_fillings;

use super::ModerationEngine;
use super::events::{JoinDecision, JoinEvent, Participant};

impl ModerationEngine {
    /// Decide each participant of a join batch independently, then clean up
    /// the service message.
    pub async fn evaluate_join(&self, event: &JoinEvent) -> Vec<(u64, JoinDecision)> {
        let policy = self.policies.get(event.chat_id).await;
        if !policy.enabled {
            debug!("Moderation disabled in {}, skipping join", event.chat_id);
            return event
                .participants
                .iter()
                .map(|p| (p.id, JoinDecision::Skipped))
                .collect();
        }

        let now = self.clock.now();
        let decisions = join_all(
            event
                .participants
                .iter()
                .map(|p| self.admit(&policy, &event.chat_title, p, now)),
        )
        .await;

        if policy.delete_service_messages
            && let Some(service) = event.service_message
            && self.notifier.discard(service).await
        {
            self.journal
                .record(event.chat_id, None, ActionKind::ServiceMessageDeleted, "")
                .await;
        }

        event
            .participants
            .iter()
            .map(|p| p.id)
            .zip(decisions)
            .collect()
    }

    async fn admit(
        &self,
        policy: &ConversationPolicy,
        chat_title: &str,
        participant: &Participant,
        now: DateTime<Utc>,
    ) -> JoinDecision {
        let chat_id = policy.chat_id;
        if participant.is_bot {
            debug!("Skipping bot {} in {}", participant.id, chat_id);
            return JoinDecision::Skipped;
        }

        self.journal
            .record(chat_id, Some(participant.id), ActionKind::NewMember, "")
            .await;

        if policy.min_account_age_days > 0
            && let Some(age) = participant.age_if_younger_than(policy.min_account_age_days, now)
        {
            match self.actions.remove(chat_id, participant.id).await {
                Ok(()) => {
                    info!(
                        "Removed {} from {}: account is {} days old",
                        participant.id, chat_id, age
                    );
                    self.journal
                        .record(
                            chat_id,
                            Some(participant.id),
                            ActionKind::UserBlocked,
                            format!("young_account_{}days", age),
                        )
                        .await;
                    return JoinDecision::Removed;
                }
                Err(e) => warn!(
                    "Failed to remove young account {} from {}: {}",
                    participant.id, chat_id, e
                ),
            }
        }

        if policy.challenge_enabled && self.verifier.should_challenge(policy, participant.id, now).await {
            return match self.verifier.issue(policy, participant, now).await {
                Ok(()) => JoinDecision::Challenged,
                Err(e) => {
                    warn!(
                        "Could not record challenge for {} in {}: {}",
                        participant.id, chat_id, e
                    );
                    JoinDecision::ChallengeUnavailable
                }
            };
        }

        self.welcome(policy, chat_title, participant).await
    }

    async fn welcome(
        &self,
        policy: &ConversationPolicy,
        chat_title: &str,
        participant: &Participant,
    ) -> JoinDecision {
        if policy.welcome_template.trim().is_empty() {
            return JoinDecision::Admitted;
        }

        let text = apply_welcome_fillings(
            &policy.welcome_template,
            participant.id,
            &participant.display_name,
            chat_title,
        );
        if self.notifier.send(policy.chat_id, &text).await.is_none() {
            return JoinDecision::Admitted;
        }

        self.journal
            .record(policy.chat_id, Some(participant.id), ActionKind::WelcomeSent, "")
            .await;
        JoinDecision::Welcomed
    }
}
