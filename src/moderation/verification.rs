//! Join verification state machine.
//!
//! NONE -> PENDING -> PASSED, or PENDING -> removed (record deleted). Every
//! transition is a conditional store operation; external actions run after
//! the transition is recorded and are never rolled back.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::database::{
    ActionKind, ChallengePolicy, ChallengeRecord, ConversationPolicy, ModerationStore, StoreResult,
};

use super::actions::{ChatActions, MessageRef};
use super::events::{AnswerOutcome, ChallengeAnswerEvent, Participant};
use super::journal::ActionJournal;
use super::notice::Notifier;

pub struct Verifier {
    store: Arc<dyn ModerationStore>,
    actions: Arc<dyn ChatActions>,
    journal: Arc<ActionJournal>,
    notifier: Arc<Notifier>,
}

impl Verifier {
    pub fn new(
        store: Arc<dyn ModerationStore>,
        actions: Arc<dyn ChatActions>,
        journal: Arc<ActionJournal>,
        notifier: Arc<Notifier>,
    ) -> Self {
        Self {
            store,
            actions,
            journal,
            notifier,
        }
    }

    /// Whether a joining participant must be challenged under `policy`.
    /// Unknown history (storage error) means challenge.
    pub async fn should_challenge(
        &self,
        policy: &ConversationPolicy,
        user_id: u64,
        now: DateTime<Utc>,
    ) -> bool {
        if policy.challenge_policy == ChallengePolicy::Always {
            return true;
        }

        let record = match self.store.get_challenge(policy.chat_id, user_id).await {
            Ok(record) => record,
            Err(e) => {
                warn!("Challenge lookup failed for {} in {}: {}", user_id, policy.chat_id, e);
                return true;
            }
        };

        let verified = match (policy.challenge_policy, record) {
            (ChallengePolicy::Persistent, Some(r)) => r.is_passed(),
            (ChallengePolicy::TimeBased, Some(r)) => r.passed_within(now, policy.challenge_valid_days),
            _ => false,
        };

        debug!(
            "Policy {} for {} in {}: verified={}",
            policy.challenge_policy.as_str(),
            user_id,
            policy.chat_id,
            verified
        );
        !verified
    }

    /// Record a pending challenge, mute the participant and post the prompt.
    ///
    /// Fails only when the record could not be stored, in which case the
    /// participant is left unrestricted.
    pub async fn issue(
        &self,
        policy: &ConversationPolicy,
        participant: &Participant,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        let chat_id = policy.chat_id;
        let timeout = chrono::Duration::minutes(i64::from(policy.challenge_timeout_minutes));
        let record = ChallengeRecord::pending(
            chat_id,
            participant.id,
            policy.attempt_limit(),
            now,
            timeout,
        );

        let previous_prompt = self
            .store
            .get_challenge(chat_id, participant.id)
            .await
            .ok()
            .flatten()
            .filter(ChallengeRecord::is_pending)
            .and_then(|r| r.message_id);

        self.store.upsert_challenge(&record).await?;
        info!("Challenge issued to {} in {}", participant.id, chat_id);

        if let Some(message_id) = previous_prompt {
            self.notifier.discard(MessageRef::new(chat_id, message_id)).await;
        }

        if let Err(e) = self.actions.restrict(chat_id, participant.id, false).await {
            warn!("Failed to restrict {} in {}: {}", participant.id, chat_id, e);
        }

        match self
            .actions
            .send_challenge(chat_id, participant, policy.challenge_timeout_minutes)
            .await
        {
            Ok(prompt) => {
                if let Err(e) = self
                    .store
                    .attach_challenge_message(chat_id, participant.id, prompt.message_id)
                    .await
                {
                    warn!("Failed to attach prompt for {} in {}: {}", participant.id, chat_id, e);
                }
            }
            Err(e) => warn!("Failed to post challenge for {} in {}: {}", participant.id, chat_id, e),
        }

        self.journal
            .record(chat_id, Some(participant.id), ActionKind::CaptchaIssued, "")
            .await;
        Ok(())
    }

    /// Apply a button press.
    pub async fn answer(&self, event: &ChallengeAnswerEvent) -> AnswerOutcome {
        let chat_id = event.chat_id;
        if event.responder_id != event.owner_id {
            debug!(
                "{} answered the challenge of {} in {}",
                event.responder_id, event.owner_id, chat_id
            );
            return AnswerOutcome::NotYours;
        }

        let user_id = event.owner_id;
        if event.correct {
            self.answer_correct(chat_id, user_id).await
        } else {
            self.answer_wrong(chat_id, user_id).await
        }
    }

    async fn answer_correct(&self, chat_id: i64, user_id: u64) -> AnswerOutcome {
        let record = match self.store.mark_challenge_passed(chat_id, user_id).await {
            Ok(Some(record)) => record,
            Ok(None) => return AnswerOutcome::NoChallenge,
            Err(e) => {
                warn!("Failed to pass challenge for {} in {}: {}", user_id, chat_id, e);
                return AnswerOutcome::RetryLater;
            }
        };

        info!("Challenge passed by {} in {}", user_id, chat_id);
        if let Err(e) = self.actions.restrict(chat_id, user_id, true).await {
            warn!("Failed to restore {} in {}: {}", user_id, chat_id, e);
        }
        self.journal
            .record(chat_id, Some(user_id), ActionKind::CaptchaPassed, "")
            .await;
        self.discard_prompt(&record).await;
        AnswerOutcome::Passed
    }

    async fn answer_wrong(&self, chat_id: i64, user_id: u64) -> AnswerOutcome {
        let record = match self.store.increment_challenge_attempts(chat_id, user_id).await {
            Ok(Some(record)) => record,
            Ok(None) => return AnswerOutcome::NoChallenge,
            Err(e) => {
                warn!("Failed to count attempt for {} in {}: {}", user_id, chat_id, e);
                return AnswerOutcome::RetryLater;
            }
        };

        if !record.attempts_exhausted() {
            return AnswerOutcome::Retry {
                remaining: record.remaining_attempts(),
            };
        }

        // Whoever deletes the record performs the removal. A pass or a
        // re-issue that landed in between keeps the record alive.
        match self.store.claim_failed_challenge(chat_id, user_id).await {
            Ok(true) => {}
            Ok(false) => return AnswerOutcome::NoChallenge,
            Err(e) => {
                warn!("Failed to close challenge for {} in {}: {}", user_id, chat_id, e);
                return AnswerOutcome::RetryLater;
            }
        }

        info!("Removing {} from {}: challenge failed", user_id, chat_id);
        if let Err(e) = self.actions.remove(chat_id, user_id).await {
            warn!("Failed to remove {} from {}: {}", user_id, chat_id, e);
        }
        self.journal
            .record(chat_id, Some(user_id), ActionKind::UserBanned, "failed_captcha")
            .await;
        self.discard_prompt(&record).await;
        AnswerOutcome::Removed
    }

    /// Timeout transition for an expired pending record. Returns whether this
    /// call performed it.
    pub async fn expire(&self, record: &ChallengeRecord, now: DateTime<Utc>) -> bool {
        let (chat_id, user_id) = (record.chat_id, record.user_id);
        match self.store.claim_expired_challenge(chat_id, user_id, now).await {
            Ok(true) => {}
            Ok(false) => return false,
            Err(e) => {
                warn!("Failed to expire challenge for {} in {}: {}", user_id, chat_id, e);
                return false;
            }
        }

        info!("Removing {} from {}: challenge timed out", user_id, chat_id);
        if let Err(e) = self.actions.remove(chat_id, user_id).await {
            warn!("Failed to remove {} from {}: {}", user_id, chat_id, e);
        }
        self.journal
            .record(chat_id, Some(user_id), ActionKind::UserBanned, "captcha_timeout")
            .await;
        self.discard_prompt(record).await;
        true
    }

    async fn discard_prompt(&self, record: &ChallengeRecord) {
        if let Some(message_id) = record.message_id {
            self.notifier
                .discard(MessageRef::new(record.chat_id, message_id))
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;

    use super::*;
    use crate::moderation::clock::Clock;
    use crate::moderation::testing::{Call, Harness, Interleaved};

    #[tokio::test]
    async fn test_three_wrong_answers_remove_on_third() {
        let h = Harness::new().await;
        h.join(7).await;

        assert_eq!(h.answer(7, false).await, AnswerOutcome::Retry { remaining: 2 });
        assert_eq!(h.answer(7, false).await, AnswerOutcome::Retry { remaining: 1 });
        assert_eq!(h.actions.removals(7), 0);

        assert_eq!(h.answer(7, false).await, AnswerOutcome::Removed);
        assert_eq!(h.actions.removals(7), 1);
        assert!(h.engine.challenge(h.chat_id, 7).await.unwrap().is_none());
        assert!(h.logged("user_banned", "failed_captcha"));

        // Nothing left to answer.
        assert_eq!(h.answer(7, false).await, AnswerOutcome::NoChallenge);
        assert_eq!(h.actions.removals(7), 1);
    }

    #[tokio::test]
    async fn test_final_wrong_answer_loses_to_concurrent_pass() {
        let h = Harness::new().await;
        h.join(7).await;
        h.answer(7, false).await;
        h.answer(7, false).await;

        h.store.interleave_after_increment(Interleaved::Pass);
        assert_eq!(h.answer(7, false).await, AnswerOutcome::NoChallenge);

        assert_eq!(h.actions.removals(7), 0);
        let record = h.engine.challenge(h.chat_id, 7).await.unwrap().unwrap();
        assert!(record.is_passed());
        assert!(!h.logged("user_banned", "failed_captcha"));
    }

    #[tokio::test]
    async fn test_final_wrong_answer_keeps_fresh_reissue() {
        let h = Harness::new().await;
        h.join(7).await;
        h.answer(7, false).await;
        h.answer(7, false).await;

        let now = h.clock.now();
        let fresh = ChallengeRecord::pending(h.chat_id, 7, 3, now, ChronoDuration::minutes(10));
        h.store.interleave_after_increment(Interleaved::Reissue(fresh));
        assert_eq!(h.answer(7, false).await, AnswerOutcome::NoChallenge);

        assert_eq!(h.actions.removals(7), 0);
        let record = h.engine.challenge(h.chat_id, 7).await.unwrap().unwrap();
        assert!(record.is_pending());
        assert_eq!(record.attempts, 0);
    }

    #[tokio::test]
    async fn test_correct_answer_restores_posting() {
        let h = Harness::new().await;
        h.join(7).await;
        let prompt = h.engine.challenge(h.chat_id, 7).await.unwrap().unwrap().message_id.unwrap();

        assert_eq!(h.answer(7, true).await, AnswerOutcome::Passed);

        let record = h.engine.challenge(h.chat_id, 7).await.unwrap().unwrap();
        assert!(record.is_passed());
        let calls = h.actions.calls();
        assert!(calls.contains(&Call::Restrict {
            chat_id: h.chat_id,
            user_id: 7,
            can_post: true,
        }));
        assert!(calls.contains(&Call::Delete(MessageRef::new(h.chat_id, prompt))));
        assert!(h.logged("captcha_passed", ""));

        // A repeated press is a no-op.
        assert_eq!(h.answer(7, true).await, AnswerOutcome::NoChallenge);
        assert_eq!(h.count_logged("captcha_passed", ""), 1);
    }

    #[tokio::test]
    async fn test_answer_from_someone_else_changes_nothing() {
        let h = Harness::new().await;
        h.join(7).await;

        let outcome = h
            .engine
            .answer_challenge(&ChallengeAnswerEvent {
                chat_id: h.chat_id,
                responder_id: 8,
                owner_id: 7,
                correct: false,
            })
            .await;
        assert_eq!(outcome, AnswerOutcome::NotYours);

        let record = h.engine.challenge(h.chat_id, 7).await.unwrap().unwrap();
        assert!(record.is_pending());
        assert_eq!(record.attempts, 0);
    }

    #[tokio::test]
    async fn test_storage_outage_asks_to_retry() {
        let h = Harness::new().await;
        h.join(7).await;
        h.store.set_down(true);

        assert_eq!(h.answer(7, true).await, AnswerOutcome::RetryLater);
        assert_eq!(h.answer(7, false).await, AnswerOutcome::RetryLater);

        h.store.set_down(false);
        assert_eq!(h.answer(7, true).await, AnswerOutcome::Passed);
    }

    #[tokio::test]
    async fn test_should_challenge_on_storage_error() {
        let h = Harness::new().await;
        h.pass_challenge(7).await;
        let policy = h.engine.policies().get(h.chat_id).await;
        h.store.set_down(true);

        let verifier = &h.engine.verifier;
        assert!(verifier.should_challenge(&policy, 7, h.clock.now()).await);
    }

    #[tokio::test]
    async fn test_pass_wins_over_late_sweep() {
        let h = Harness::new().await;
        h.join(7).await;
        assert_eq!(h.answer(7, true).await, AnswerOutcome::Passed);

        h.clock.advance(ChronoDuration::minutes(11));
        assert_eq!(h.engine.sweep_expired().await.removed, 0);
        assert_eq!(h.actions.removals(7), 0);
    }
}
