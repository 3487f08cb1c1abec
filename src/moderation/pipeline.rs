//! Per-message checks, applied in a fixed order.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::database::{ActionKind, ConversationPolicy};

use super::ModerationEngine;
use super::counters::CooldownDecision;
use super::events::{ContentEvent, ContentVerdict};
use super::notice::texts;
use super::spam::{SPAM_CHECK_MAX_AGE_DAYS, contains_spam};

/// Log kinds and labels that differ between thread replies and plain messages.
struct Scope {
    posted: ActionKind,
    deleted: ActionKind,
    label: &'static str,
}

impl Scope {
    fn of(event: &ContentEvent) -> Self {
        if event.is_thread_reply {
            Self {
                posted: ActionKind::CommentPosted,
                deleted: ActionKind::CommentDeleted,
                label: "comments",
            }
        } else {
            Self {
                posted: ActionKind::MessagePosted,
                deleted: ActionKind::MessageDeleted,
                label: "messages",
            }
        }
    }
}

/// Log detail for a posted message: the start of its text.
fn posted_detail(event: &ContentEvent) -> String {
    match event.text.as_deref() {
        Some(text) => format!("text: {}", text.chars().take(100).collect::<String>()),
        None => "no text".to_string(),
    }
}

impl ModerationEngine {
    pub async fn evaluate_content(&self, event: &ContentEvent) -> ContentVerdict {
        let chat_id = event.chat_id;
        let sender = &event.sender;
        let policy = self.policies.get(chat_id).await;
        if !policy.enabled || sender.is_bot {
            return ContentVerdict::Allowed;
        }

        let now = self.clock.now();

        if policy.challenge_enabled && self.has_pending_challenge(chat_id, sender.id).await {
            debug!("Dropping post from unverified {} in {}", sender.id, chat_id);
            self.notifier.discard(event.message).await;
            self.notifier
                .notify(chat_id, &texts::challenge_pending(&sender.display_name))
                .await;
            return ContentVerdict::ChallengePending;
        }

        if policy.cooldown_enabled
            && let CooldownDecision::Reject { remaining_secs } = self
                .counters
                .try_accept(chat_id, sender.id, now, self.settings.cooldown)
                .await
        {
            self.notifier.discard(event.message).await;
            self.notifier
                .notify(chat_id, &texts::cooldown(&sender.display_name, remaining_secs))
                .await;
            return ContentVerdict::Cooldown { remaining_secs };
        }

        if event.is_thread_reply && !policy.protect_content {
            return ContentVerdict::Allowed;
        }

        let scope = Scope::of(event);
        self.journal
            .record(chat_id, Some(sender.id), scope.posted, posted_detail(event))
            .await;

        if event.is_thread_reply
            && policy.min_account_age_days > 0
            && let Some(age) = sender.age_if_younger_than(policy.min_account_age_days, now)
        {
            info!("Deleting comment from {} in {}: account is {} days old", sender.id, chat_id, age);
            self.notifier.discard(event.message).await;
            self.journal
                .record(
                    chat_id,
                    Some(sender.id),
                    ActionKind::CommentDeleted,
                    format!("young_account_{}days", age),
                )
                .await;
            self.notifier
                .notify(
                    chat_id,
                    &texts::young_account(&sender.display_name, policy.min_account_age_days),
                )
                .await;
            return ContentVerdict::YoungAccount { age_days: age };
        }

        if policy.anti_flood_enabled {
            let check = self.counters.record_and_check(chat_id, sender.id, now).await;
            if check.flood {
                return self.punish_flood(&policy, event, &scope, now).await;
            }
        }

        if event.is_thread_reply
            && event.text.as_deref().is_some_and(contains_spam)
            && sender
                .age_if_younger_than(SPAM_CHECK_MAX_AGE_DAYS, now)
                .is_some()
        {
            info!("Deleting spam comment from {} in {}", sender.id, chat_id);
            self.notifier.discard(event.message).await;
            self.journal
                .record(
                    chat_id,
                    Some(sender.id),
                    ActionKind::CommentDeleted,
                    "spam_link_detected",
                )
                .await;
            self.notifier
                .notify(chat_id, &texts::spam(&sender.display_name))
                .await;
            return ContentVerdict::Spam;
        }

        ContentVerdict::Allowed
    }

    async fn has_pending_challenge(&self, chat_id: i64, user_id: u64) -> bool {
        match self.store.get_challenge(chat_id, user_id).await {
            Ok(record) => record.is_some_and(|r| r.is_pending()),
            Err(e) => {
                warn!("Challenge lookup failed for {} in {}: {}", user_id, chat_id, e);
                false
            }
        }
    }

    async fn punish_flood(
        &self,
        policy: &ConversationPolicy,
        event: &ContentEvent,
        scope: &Scope,
        now: DateTime<Utc>,
    ) -> ContentVerdict {
        let chat_id = event.chat_id;
        let sender = &event.sender;
        let max_warnings = policy.warning_limit();

        self.notifier.discard(event.message).await;
        self.journal
            .record(chat_id, Some(sender.id), scope.deleted, "flood_detected")
            .await;

        let Some(warnings) = self.warnings.add_violation(chat_id, sender.id, now).await else {
            return ContentVerdict::Flood {
                warnings: 0,
                removed: false,
            };
        };

        if warnings < max_warnings {
            info!(
                "Flood from {} in {}: warning {}/{}",
                sender.id, chat_id, warnings, max_warnings
            );
            self.notifier
                .notify(
                    chat_id,
                    &texts::flood_warning(&sender.display_name, warnings, max_warnings),
                )
                .await;
            return ContentVerdict::Flood {
                warnings,
                removed: false,
            };
        }

        info!("Removing {} from {}: {} flood warnings", sender.id, chat_id, warnings);
        if let Err(e) = self.actions.remove(chat_id, sender.id).await {
            warn!("Failed to remove {} from {}: {}", sender.id, chat_id, e);
        }
        self.journal
            .record(
                chat_id,
                Some(sender.id),
                ActionKind::UserBanned,
                format!("max_warnings_{}", scope.label),
            )
            .await;
        if let Err(e) = self.warnings.reset(chat_id, sender.id).await {
            warn!("Failed to reset warnings for {} in {}: {}", sender.id, chat_id, e);
        }
        self.notifier
            .notify(chat_id, &texts::flood_removed(&sender.display_name))
            .await;

        ContentVerdict::Flood {
            warnings,
            removed: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;

    use super::*;
    use crate::moderation::MessageRef;
    use crate::moderation::events::Participant;
    use crate::moderation::testing::{Call, Harness, at};

    fn post(h: &Harness, user_id: u64, message_id: i32) -> ContentEvent {
        ContentEvent {
            chat_id: h.chat_id,
            sender: Participant::new(user_id, format!("user{}", user_id)),
            message: MessageRef::new(h.chat_id, message_id),
            text: Some("hello".into()),
            is_thread_reply: false,
        }
    }

    fn comment(h: &Harness, user_id: u64, message_id: i32, text: &str, age_days: i64) -> ContentEvent {
        let mut event = post(h, user_id, message_id);
        event.is_thread_reply = true;
        event.text = Some(text.into());
        event.sender.account_created_at = Some(at(0) - ChronoDuration::days(age_days));
        event
    }

    #[tokio::test]
    async fn test_sixth_message_flagged_and_warns_once() {
        let h = Harness::new().await;
        for i in 0..5 {
            let verdict = h.engine.evaluate_content(&post(&h, 7, i)).await;
            assert_eq!(verdict, ContentVerdict::Allowed);
            h.clock.advance(ChronoDuration::seconds(1));
        }

        let verdict = h.engine.evaluate_content(&post(&h, 7, 5)).await;
        assert_eq!(verdict, ContentVerdict::Flood { warnings: 1, removed: false });
        assert_eq!(h.engine.warnings(h.chat_id, 7).await.unwrap(), 1);
        assert!(h.actions.calls().contains(&Call::Delete(MessageRef::new(h.chat_id, 5))));
        assert!(h.logged("message_deleted", "flood_detected"));
    }

    #[tokio::test]
    async fn test_warning_escalation_removes_and_resets() {
        let h = Harness::new().await;
        h.set_policy(|p| p.max_warnings = 2).await;
        for i in 0..5 {
            h.engine.evaluate_content(&post(&h, 7, i)).await;
        }

        assert_eq!(
            h.engine.evaluate_content(&post(&h, 7, 5)).await,
            ContentVerdict::Flood { warnings: 1, removed: false }
        );
        assert_eq!(
            h.engine.evaluate_content(&post(&h, 7, 6)).await,
            ContentVerdict::Flood { warnings: 2, removed: true }
        );
        assert_eq!(h.actions.removals(7), 1);
        assert_eq!(h.engine.warnings(h.chat_id, 7).await.unwrap(), 0);
        assert!(h.logged("user_banned", "max_warnings_messages"));

        // The ledger starts again from zero.
        assert_eq!(
            h.engine.evaluate_content(&post(&h, 7, 7)).await,
            ContentVerdict::Flood { warnings: 1, removed: false }
        );
    }

    #[tokio::test]
    async fn test_cooldown_rejects_with_remaining_seconds() {
        let h = Harness::new().await;
        h.set_policy(|p| p.cooldown_enabled = true).await;

        assert_eq!(h.engine.evaluate_content(&post(&h, 7, 1)).await, ContentVerdict::Allowed);
        h.clock.advance(ChronoDuration::seconds(12));
        assert_eq!(
            h.engine.evaluate_content(&post(&h, 7, 2)).await,
            ContentVerdict::Cooldown { remaining_secs: 18 }
        );
        assert_eq!(
            h.engine.cooldown(h.chat_id, 7).await.unwrap().unwrap().last_post_at,
            at(0)
        );

        h.clock.advance(ChronoDuration::seconds(18));
        assert_eq!(h.engine.evaluate_content(&post(&h, 7, 3)).await, ContentVerdict::Allowed);
    }

    #[tokio::test]
    async fn test_pending_challenge_blocks_posts() {
        let h = Harness::new().await;
        h.join(7).await;

        let verdict = h.engine.evaluate_content(&post(&h, 7, 42)).await;
        assert_eq!(verdict, ContentVerdict::ChallengePending);
        assert!(h.actions.calls().contains(&Call::Delete(MessageRef::new(h.chat_id, 42))));

        h.answer(7, true).await;
        assert_eq!(h.engine.evaluate_content(&post(&h, 7, 43)).await, ContentVerdict::Allowed);
    }

    #[tokio::test]
    async fn test_young_account_comment_deleted() {
        let h = Harness::new().await;
        h.set_policy(|p| p.min_account_age_days = 3).await;

        let verdict = h.engine.evaluate_content(&comment(&h, 7, 1, "hi", 1)).await;
        assert_eq!(verdict, ContentVerdict::YoungAccount { age_days: 1 });
        assert!(h.logged("comment_deleted", "young_account_1days"));

        // Plain messages are not subject to the age check.
        let mut event = comment(&h, 7, 2, "hi", 1);
        event.is_thread_reply = false;
        assert_eq!(h.engine.evaluate_content(&event).await, ContentVerdict::Allowed);
    }

    #[tokio::test]
    async fn test_spam_link_from_new_account() {
        let h = Harness::new().await;

        let verdict = h
            .engine
            .evaluate_content(&comment(&h, 7, 1, "buy at https://x.example", 3))
            .await;
        assert_eq!(verdict, ContentVerdict::Spam);
        assert!(h.logged("comment_deleted", "spam_link_detected"));

        let verdict = h
            .engine
            .evaluate_content(&comment(&h, 8, 2, "docs: https://x.example", 30))
            .await;
        assert_eq!(verdict, ContentVerdict::Allowed);
    }

    #[tokio::test]
    async fn test_unprotected_comments_bypass_checks() {
        let h = Harness::new().await;
        h.set_policy(|p| p.protect_content = false).await;

        let verdict = h
            .engine
            .evaluate_content(&comment(&h, 7, 1, "https://spam.example", 0))
            .await;
        assert_eq!(verdict, ContentVerdict::Allowed);
        assert!(!h.logged("comment_posted", "text: https://spam.example"));
    }

    #[tokio::test]
    async fn test_storage_outage_never_rejects() {
        let h = Harness::new().await;
        h.set_policy(|p| p.cooldown_enabled = true).await;
        h.store.set_down(true);

        for i in 0..10 {
            assert_eq!(h.engine.evaluate_content(&post(&h, 7, i)).await, ContentVerdict::Allowed);
        }
    }

    #[tokio::test]
    async fn test_bots_and_disabled_chats_allowed() {
        let h = Harness::new().await;
        let mut event = post(&h, 7, 1);
        event.sender.is_bot = true;
        for _ in 0..10 {
            assert_eq!(h.engine.evaluate_content(&event).await, ContentVerdict::Allowed);
        }

        h.set_policy(|p| p.enabled = false).await;
        for i in 0..10 {
            assert_eq!(h.engine.evaluate_content(&post(&h, 8, i)).await, ContentVerdict::Allowed);
        }
        assert!(h.actions.calls().is_empty());
    }
}
