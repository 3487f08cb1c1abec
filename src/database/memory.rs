//! In-process store backed by `DashMap`.
//!
//! Each per-user mutation runs inside a single map entry guard, which acts as
//! the per-key mutex the engine relies on. Used when `STORAGE=memory` and by
//! the test suite.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;

use super::error::StoreResult;
use super::models::{
    ActionLogEntry, ChallengeRecord, ChallengeState, ConversationPolicy, CooldownRecord,
    FloodCounter, WarningLedgerEntry,
};
use super::store::{ModerationStore, chrono_duration};

type UserKey = (i64, u64);

/// Non-persistent store. State is lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    policies: DashMap<i64, ConversationPolicy>,
    challenges: DashMap<UserKey, ChallengeRecord>,
    floods: DashMap<UserKey, FloodCounter>,
    cooldowns: DashMap<UserKey, CooldownRecord>,
    warnings: DashMap<UserKey, WarningLedgerEntry>,
    log: Mutex<Vec<ActionLogEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the action log.
    #[cfg(test)]
    pub fn events(&self) -> Vec<ActionLogEntry> {
        self.log.lock().clone()
    }
}

#[async_trait]
impl ModerationStore for MemoryStore {
    async fn load_policy(&self, chat_id: i64) -> StoreResult<Option<ConversationPolicy>> {
        Ok(self.policies.get(&chat_id).map(|p| p.clone()))
    }

    async fn save_policy(&self, policy: &ConversationPolicy) -> StoreResult<()> {
        self.policies.insert(policy.chat_id, policy.clone());
        Ok(())
    }

    async fn log_event(&self, entry: ActionLogEntry) -> StoreResult<()> {
        self.log.lock().push(entry);
        Ok(())
    }

    async fn upsert_challenge(&self, record: &ChallengeRecord) -> StoreResult<()> {
        self.challenges
            .insert((record.chat_id, record.user_id), record.clone());
        Ok(())
    }

    async fn attach_challenge_message(
        &self,
        chat_id: i64,
        user_id: u64,
        message_id: i32,
    ) -> StoreResult<()> {
        if let Some(mut record) = self.challenges.get_mut(&(chat_id, user_id))
            && record.is_pending()
        {
            record.message_id = Some(message_id);
        }
        Ok(())
    }

    async fn get_challenge(
        &self,
        chat_id: i64,
        user_id: u64,
    ) -> StoreResult<Option<ChallengeRecord>> {
        Ok(self.challenges.get(&(chat_id, user_id)).map(|r| r.clone()))
    }

    async fn mark_challenge_passed(
        &self,
        chat_id: i64,
        user_id: u64,
    ) -> StoreResult<Option<ChallengeRecord>> {
        let Some(mut record) = self.challenges.get_mut(&(chat_id, user_id)) else {
            return Ok(None);
        };
        if !record.is_pending() {
            return Ok(None);
        }
        record.state = ChallengeState::Passed;
        Ok(Some(record.clone()))
    }

    async fn increment_challenge_attempts(
        &self,
        chat_id: i64,
        user_id: u64,
    ) -> StoreResult<Option<ChallengeRecord>> {
        let Some(mut record) = self.challenges.get_mut(&(chat_id, user_id)) else {
            return Ok(None);
        };
        if !record.is_pending() {
            return Ok(None);
        }
        record.attempts += 1;
        Ok(Some(record.clone()))
    }

    async fn claim_failed_challenge(&self, chat_id: i64, user_id: u64) -> StoreResult<bool> {
        Ok(self
            .challenges
            .remove_if(&(chat_id, user_id), |_, r| r.is_pending() && r.attempts_exhausted())
            .is_some())
    }

    async fn expired_challenges(&self, now: DateTime<Utc>) -> StoreResult<Vec<ChallengeRecord>> {
        Ok(self
            .challenges
            .iter()
            .filter(|r| r.is_expired(now))
            .map(|r| r.clone())
            .collect())
    }

    async fn claim_expired_challenge(
        &self,
        chat_id: i64,
        user_id: u64,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        Ok(self
            .challenges
            .remove_if(&(chat_id, user_id), |_, r| r.is_expired(now))
            .is_some())
    }

    async fn record_flood(
        &self,
        chat_id: i64,
        user_id: u64,
        now: DateTime<Utc>,
        window: Duration,
    ) -> StoreResult<FloodCounter> {
        let cutoff = now - chrono_duration(window);
        let counter = match self.floods.entry((chat_id, user_id)) {
            Entry::Occupied(mut entry) => {
                let counter = entry.get_mut();
                if counter.is_stale(cutoff) {
                    counter.count = 0;
                }
                counter.count += 1;
                counter.window_start = now;
                counter.clone()
            }
            Entry::Vacant(entry) => {
                let counter = FloodCounter::first(chat_id, user_id, now);
                entry.insert(counter.clone());
                counter
            }
        };
        Ok(counter)
    }

    async fn get_flood(
        &self,
        chat_id: i64,
        user_id: u64,
        now: DateTime<Utc>,
        window: Duration,
    ) -> StoreResult<Option<FloodCounter>> {
        let cutoff = now - chrono_duration(window);
        let key = (chat_id, user_id);
        self.floods.remove_if(&key, |_, c| c.is_stale(cutoff));
        Ok(self.floods.get(&key).map(|c| c.clone()))
    }

    async fn accept_post(
        &self,
        chat_id: i64,
        user_id: u64,
        now: DateTime<Utc>,
        cooldown: Duration,
    ) -> StoreResult<Option<DateTime<Utc>>> {
        let cutoff = now - chrono_duration(cooldown);
        let previous = match self.cooldowns.entry((chat_id, user_id)) {
            Entry::Occupied(mut entry) => {
                let record = entry.get_mut();
                let previous = record.last_post_at;
                if previous <= cutoff {
                    record.last_post_at = now;
                }
                Some(previous)
            }
            Entry::Vacant(entry) => {
                entry.insert(CooldownRecord {
                    chat_id,
                    user_id,
                    last_post_at: now,
                });
                None
            }
        };
        Ok(previous)
    }

    async fn get_cooldown(
        &self,
        chat_id: i64,
        user_id: u64,
    ) -> StoreResult<Option<CooldownRecord>> {
        Ok(self.cooldowns.get(&(chat_id, user_id)).map(|r| r.clone()))
    }

    async fn purge_stale_cooldowns(&self, before: DateTime<Utc>) -> StoreResult<u64> {
        let mut removed = 0u64;
        self.cooldowns.retain(|_, r| {
            let keep = r.last_post_at >= before;
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }

    async fn reset_chat_cooldowns(&self, chat_id: i64) -> StoreResult<u64> {
        Ok(retain_other_chats(&self.cooldowns, chat_id))
    }

    async fn add_warning(&self, chat_id: i64, user_id: u64, now: DateTime<Utc>) -> StoreResult<u32> {
        let mut entry = self
            .warnings
            .entry((chat_id, user_id))
            .or_insert_with(|| WarningLedgerEntry {
                chat_id,
                user_id,
                count: 0,
                last_warning_at: now,
            });
        entry.count += 1;
        entry.last_warning_at = now;
        Ok(entry.count)
    }

    async fn get_warnings(&self, chat_id: i64, user_id: u64) -> StoreResult<u32> {
        Ok(self
            .warnings
            .get(&(chat_id, user_id))
            .map(|w| w.count)
            .unwrap_or(0))
    }

    async fn reset_warnings(&self, chat_id: i64, user_id: u64) -> StoreResult<bool> {
        Ok(self.warnings.remove(&(chat_id, user_id)).is_some())
    }

    async fn reset_chat_warnings(&self, chat_id: i64) -> StoreResult<u64> {
        Ok(retain_other_chats(&self.warnings, chat_id))
    }
}

/// Remove every entry of `chat_id`, returning how many went.
fn retain_other_chats<V>(map: &DashMap<UserKey, V>, chat_id: i64) -> u64 {
    let mut removed = 0u64;
    map.retain(|(chat, _), _| {
        let keep = *chat != chat_id;
        if !keep {
            removed += 1;
        }
        keep
    });
    removed
}
