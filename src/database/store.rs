//! Persistence interface used by the moderation engine.
//!
//! Every mutation of a per-user record is a single atomic operation at the
//! storage layer (insert-or-update-with-return). Callers never read a record,
//! compute, and write it back.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::StoreResult;
use super::models::{
    ActionLogEntry, ChallengeRecord, ConversationPolicy, CooldownRecord, FloodCounter,
};

#[async_trait]
pub trait ModerationStore: Send + Sync {
    // Settings and action log

    async fn load_policy(&self, chat_id: i64) -> StoreResult<Option<ConversationPolicy>>;

    async fn save_policy(&self, policy: &ConversationPolicy) -> StoreResult<()>;

    async fn log_event(&self, entry: ActionLogEntry) -> StoreResult<()>;

    // Challenges

    /// Insert or overwrite the challenge for the record's (chat, user).
    async fn upsert_challenge(&self, record: &ChallengeRecord) -> StoreResult<()>;

    /// Remember the delivered prompt for a pending challenge.
    async fn attach_challenge_message(
        &self,
        chat_id: i64,
        user_id: u64,
        message_id: i32,
    ) -> StoreResult<()>;

    async fn get_challenge(&self, chat_id: i64, user_id: u64)
    -> StoreResult<Option<ChallengeRecord>>;

    /// PENDING → PASSED. Returns the updated record, or `None` if nothing was pending.
    async fn mark_challenge_passed(
        &self,
        chat_id: i64,
        user_id: u64,
    ) -> StoreResult<Option<ChallengeRecord>>;

    /// Increment attempts of a pending challenge and return the updated record.
    async fn increment_challenge_attempts(
        &self,
        chat_id: i64,
        user_id: u64,
    ) -> StoreResult<Option<ChallengeRecord>>;

    /// Delete the challenge only if it is still pending with its attempts
    /// used up. Exactly one caller can win this claim.
    async fn claim_failed_challenge(&self, chat_id: i64, user_id: u64) -> StoreResult<bool>;

    /// Pending challenges whose deadline is before `now`.
    async fn expired_challenges(&self, now: DateTime<Utc>) -> StoreResult<Vec<ChallengeRecord>>;

    /// Delete the challenge only if it is still pending and expired at `now`.
    /// Exactly one caller can win this claim.
    async fn claim_expired_challenge(
        &self,
        chat_id: i64,
        user_id: u64,
        now: DateTime<Utc>,
    ) -> StoreResult<bool>;

    // Flood window

    /// Count a message in the sliding window and return the resulting counter.
    async fn record_flood(
        &self,
        chat_id: i64,
        user_id: u64,
        now: DateTime<Utc>,
        window: Duration,
    ) -> StoreResult<FloodCounter>;

    /// The live window, if any. Lapsed windows are discarded.
    async fn get_flood(
        &self,
        chat_id: i64,
        user_id: u64,
        now: DateTime<Utc>,
        window: Duration,
    ) -> StoreResult<Option<FloodCounter>>;

    // Cooldown

    /// Set `last_post_at = now` unless the previous post is younger than
    /// `cooldown`. Returns the previous `last_post_at`, if any.
    async fn accept_post(
        &self,
        chat_id: i64,
        user_id: u64,
        now: DateTime<Utc>,
        cooldown: Duration,
    ) -> StoreResult<Option<DateTime<Utc>>>;

    async fn get_cooldown(&self, chat_id: i64, user_id: u64) -> StoreResult<Option<CooldownRecord>>;

    /// Drop cooldown records older than `before`. Returns the number removed.
    async fn purge_stale_cooldowns(&self, before: DateTime<Utc>) -> StoreResult<u64>;

    /// Drop every cooldown record of a chat.
    async fn reset_chat_cooldowns(&self, chat_id: i64) -> StoreResult<u64>;

    // Warning ledger

    /// Increment-or-insert and return the new count.
    async fn add_warning(&self, chat_id: i64, user_id: u64, now: DateTime<Utc>) -> StoreResult<u32>;

    async fn get_warnings(&self, chat_id: i64, user_id: u64) -> StoreResult<u32>;

    async fn reset_warnings(&self, chat_id: i64, user_id: u64) -> StoreResult<bool>;

    /// Drop every ledger entry of a chat.
    async fn reset_chat_warnings(&self, chat_id: i64) -> StoreResult<u64>;
}

/// Convert a std duration into a chrono one, capped at a century so that
/// timestamp arithmetic cannot overflow.
pub fn chrono_duration(duration: Duration) -> chrono::Duration {
    let cap = chrono::Duration::days(36_500);
    chrono::Duration::from_std(duration).map_or(cap, |d| d.min(cap))
}
