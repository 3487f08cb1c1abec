//! Flood and cooldown counters.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::database::{ModerationStore, chrono_duration};

/// Outcome of a cooldown check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownDecision {
    Accept,
    Reject { remaining_secs: u64 },
}

/// Outcome of counting one message in the flood window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloodCheck {
    pub count: u32,
    pub flood: bool,
}

/// Cooldown records untouched for this long are dropped by the sweeper.
pub const COOLDOWN_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

pub struct AbuseCounters {
    store: Arc<dyn ModerationStore>,
    flood_window: Duration,
    flood_limit: u32,
}

impl AbuseCounters {
    pub fn new(store: Arc<dyn ModerationStore>, flood_window: Duration, flood_limit: u32) -> Self {
        Self {
            store,
            flood_window,
            flood_limit,
        }
    }

    /// Accept the post unless the previous accepted post is younger than
    /// `cooldown`. A rejected post leaves the stored timestamp alone.
    pub async fn try_accept(
        &self,
        chat_id: i64,
        user_id: u64,
        now: DateTime<Utc>,
        cooldown: Duration,
    ) -> CooldownDecision {
        let previous = match self.store.accept_post(chat_id, user_id, now, cooldown).await {
            Ok(previous) => previous,
            Err(e) => {
                warn!("Cooldown check failed for {} in {}: {}", user_id, chat_id, e);
                return CooldownDecision::Accept;
            }
        };

        let Some(previous) = previous else {
            return CooldownDecision::Accept;
        };

        let cooldown = chrono_duration(cooldown);
        let elapsed = now - previous;
        if elapsed >= cooldown {
            return CooldownDecision::Accept;
        }

        let remaining_ms = (cooldown - elapsed)
            .num_milliseconds()
            .clamp(1, cooldown.num_milliseconds().max(1));
        let remaining_secs = (remaining_ms as u64).div_ceil(1000);
        debug!("Cooldown for {} in {}: {}s left", user_id, chat_id, remaining_secs);
        CooldownDecision::Reject { remaining_secs }
    }

    /// Count the message and report whether the limit is exceeded.
    pub async fn record_and_check(&self, chat_id: i64, user_id: u64, now: DateTime<Utc>) -> FloodCheck {
        match self
            .store
            .record_flood(chat_id, user_id, now, self.flood_window)
            .await
        {
            Ok(counter) => FloodCheck {
                count: counter.count,
                flood: counter.count > self.flood_limit,
            },
            Err(e) => {
                warn!("Flood check failed for {} in {}: {}", user_id, chat_id, e);
                FloodCheck {
                    count: 0,
                    flood: false,
                }
            }
        }
    }

    /// Drop cooldown records older than the retention period.
    pub async fn purge_stale(&self, now: DateTime<Utc>) -> u64 {
        let before = now - chrono_duration(COOLDOWN_RETENTION);
        match self.store.purge_stale_cooldowns(before).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!("Cooldown purge failed: {}", e);
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::moderation::testing::{FlakyStore, at};

    fn counters(store: Arc<dyn ModerationStore>) -> AbuseCounters {
        AbuseCounters::new(store, Duration::from_secs(10), 5)
    }

    #[tokio::test]
    async fn test_sixth_message_in_window_is_flood() {
        let counters = counters(Arc::new(MemoryStore::new()));
        for i in 0..5 {
            let check = counters.record_and_check(1, 2, at(i)).await;
            assert!(!check.flood, "message {} flagged", i + 1);
        }
        let check = counters.record_and_check(1, 2, at(5)).await;
        assert_eq!(check, FloodCheck { count: 6, flood: true });
    }

    #[tokio::test]
    async fn test_gap_longer_than_window_resets_count() {
        let counters = counters(Arc::new(MemoryStore::new()));
        for i in 0..5 {
            counters.record_and_check(1, 2, at(i)).await;
        }
        let check = counters.record_and_check(1, 2, at(15)).await;
        assert_eq!(check, FloodCheck { count: 1, flood: false });
    }

    #[tokio::test]
    async fn test_cooldown_reports_ceiling_and_keeps_timestamp() {
        let store = Arc::new(MemoryStore::new());
        let counters = counters(store.clone());
        let cooldown = Duration::from_secs(30);

        assert_eq!(counters.try_accept(1, 2, at(0), cooldown).await, CooldownDecision::Accept);
        let decision = counters
            .try_accept(1, 2, at(12) + chrono::Duration::milliseconds(500), cooldown)
            .await;
        assert_eq!(decision, CooldownDecision::Reject { remaining_secs: 18 });
        assert_eq!(
            store.get_cooldown(1, 2).await.unwrap().unwrap().last_post_at,
            at(0)
        );

        assert_eq!(counters.try_accept(1, 2, at(30), cooldown).await, CooldownDecision::Accept);
    }

    #[tokio::test]
    async fn test_storage_failure_never_rejects() {
        let counters = counters(Arc::new(FlakyStore::down()));
        assert_eq!(
            counters.try_accept(1, 2, at(0), Duration::from_secs(30)).await,
            CooldownDecision::Accept
        );
        assert!(!counters.record_and_check(1, 2, at(0)).await.flood);
    }
}
