//! `ModerationStore` backed by MongoDB.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::Database;
use super::error::StoreResult;
use super::models::{
    ActionLogEntry, ChallengeRecord, ConversationPolicy, CooldownRecord, FloodCounter,
};
use super::repository::{
    ActionLogRepository, ChallengeRepository, CooldownRepository, FloodRepository,
    PolicyRepository, WarningRepository,
};
use super::store::{ModerationStore, chrono_duration};

/// Persistent store. Each trait method maps onto one repository call.
pub struct MongoStore {
    policies: PolicyRepository,
    action_log: ActionLogRepository,
    challenges: ChallengeRepository,
    floods: FloodRepository,
    cooldowns: CooldownRepository,
    warnings: WarningRepository,
}

impl MongoStore {
    pub fn new(db: &Database) -> Self {
        Self {
            policies: PolicyRepository::new(db),
            action_log: ActionLogRepository::new(db),
            challenges: ChallengeRepository::new(db),
            floods: FloodRepository::new(db),
            cooldowns: CooldownRepository::new(db),
            warnings: WarningRepository::new(db),
        }
    }
}

#[async_trait]
impl ModerationStore for MongoStore {
    async fn load_policy(&self, chat_id: i64) -> StoreResult<Option<ConversationPolicy>> {
        self.policies.get(chat_id).await
    }

    async fn save_policy(&self, policy: &ConversationPolicy) -> StoreResult<()> {
        self.policies.save(policy).await
    }

    async fn log_event(&self, entry: ActionLogEntry) -> StoreResult<()> {
        self.action_log.append(&entry).await
    }

    async fn upsert_challenge(&self, record: &ChallengeRecord) -> StoreResult<()> {
        self.challenges.save(record).await
    }

    async fn attach_challenge_message(
        &self,
        chat_id: i64,
        user_id: u64,
        message_id: i32,
    ) -> StoreResult<()> {
        self.challenges.set_message(chat_id, user_id, message_id).await
    }

    async fn get_challenge(
        &self,
        chat_id: i64,
        user_id: u64,
    ) -> StoreResult<Option<ChallengeRecord>> {
        self.challenges.get(chat_id, user_id).await
    }

    async fn mark_challenge_passed(
        &self,
        chat_id: i64,
        user_id: u64,
    ) -> StoreResult<Option<ChallengeRecord>> {
        self.challenges.mark_passed(chat_id, user_id).await
    }

    async fn increment_challenge_attempts(
        &self,
        chat_id: i64,
        user_id: u64,
    ) -> StoreResult<Option<ChallengeRecord>> {
        self.challenges.increment_attempts(chat_id, user_id).await
    }

    async fn claim_failed_challenge(&self, chat_id: i64, user_id: u64) -> StoreResult<bool> {
        self.challenges.claim_failed(chat_id, user_id).await
    }

    async fn expired_challenges(&self, now: DateTime<Utc>) -> StoreResult<Vec<ChallengeRecord>> {
        self.challenges.expired(now).await
    }

    async fn claim_expired_challenge(
        &self,
        chat_id: i64,
        user_id: u64,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        self.challenges.claim_expired(chat_id, user_id, now).await
    }

    async fn record_flood(
        &self,
        chat_id: i64,
        user_id: u64,
        now: DateTime<Utc>,
        window: Duration,
    ) -> StoreResult<FloodCounter> {
        let cutoff = now - chrono_duration(window);
        self.floods.record(chat_id, user_id, now, cutoff).await
    }

    async fn get_flood(
        &self,
        chat_id: i64,
        user_id: u64,
        now: DateTime<Utc>,
        window: Duration,
    ) -> StoreResult<Option<FloodCounter>> {
        let cutoff = now - chrono_duration(window);
        self.floods.get(chat_id, user_id, cutoff).await
    }

    async fn accept_post(
        &self,
        chat_id: i64,
        user_id: u64,
        now: DateTime<Utc>,
        cooldown: Duration,
    ) -> StoreResult<Option<DateTime<Utc>>> {
        let cutoff = now - chrono_duration(cooldown);
        let previous = self.cooldowns.accept(chat_id, user_id, now, cutoff).await?;
        Ok(previous.map(|r| r.last_post_at))
    }

    async fn get_cooldown(
        &self,
        chat_id: i64,
        user_id: u64,
    ) -> StoreResult<Option<CooldownRecord>> {
        self.cooldowns.get(chat_id, user_id).await
    }

    async fn purge_stale_cooldowns(&self, before: DateTime<Utc>) -> StoreResult<u64> {
        self.cooldowns.purge_before(before).await
    }

    async fn reset_chat_cooldowns(&self, chat_id: i64) -> StoreResult<u64> {
        self.cooldowns.reset_chat(chat_id).await
    }

    async fn add_warning(&self, chat_id: i64, user_id: u64, now: DateTime<Utc>) -> StoreResult<u32> {
        self.warnings.add(chat_id, user_id, now).await
    }

    async fn get_warnings(&self, chat_id: i64, user_id: u64) -> StoreResult<u32> {
        self.warnings.count(chat_id, user_id).await
    }

    async fn reset_warnings(&self, chat_id: i64, user_id: u64) -> StoreResult<bool> {
        self.warnings.reset(chat_id, user_id).await
    }

    async fn reset_chat_warnings(&self, chat_id: i64) -> StoreResult<u64> {
        self.warnings.reset_chat(chat_id).await
    }
}
