//! Warning ledger.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, warn};

use crate::database::{ModerationStore, StoreResult};

pub struct WarningLedger {
    store: Arc<dyn ModerationStore>,
}

impl WarningLedger {
    pub fn new(store: Arc<dyn ModerationStore>) -> Self {
        Self { store }
    }

    /// Add one violation and return the new count. The increment is retried
    /// once; `None` means it could not be recorded.
    pub async fn add_violation(&self, chat_id: i64, user_id: u64, now: DateTime<Utc>) -> Option<u32> {
        match self.store.add_warning(chat_id, user_id, now).await {
            Ok(count) => return Some(count),
            Err(e) => warn!("Warning increment failed for {} in {}, retrying: {}", user_id, chat_id, e),
        }

        match self.store.add_warning(chat_id, user_id, now).await {
            Ok(count) => Some(count),
            Err(e) => {
                error!("Warning increment failed for {} in {}: {}", user_id, chat_id, e);
                None
            }
        }
    }

    pub async fn reset(&self, chat_id: i64, user_id: u64) -> StoreResult<bool> {
        self.store.reset_warnings(chat_id, user_id).await
    }

    pub async fn count(&self, chat_id: i64, user_id: u64) -> StoreResult<u32> {
        self.store.get_warnings(chat_id, user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::moderation::testing::{FlakyStore, at};

    #[tokio::test]
    async fn test_add_and_reset() {
        let ledger = WarningLedger::new(Arc::new(MemoryStore::new()));
        assert_eq!(ledger.add_violation(1, 2, at(0)).await, Some(1));
        assert_eq!(ledger.add_violation(1, 2, at(1)).await, Some(2));
        assert!(ledger.reset(1, 2).await.unwrap());
        assert_eq!(ledger.count(1, 2).await.unwrap(), 0);
        assert_eq!(ledger.add_violation(1, 2, at(2)).await, Some(1));
    }

    #[tokio::test]
    async fn test_increment_is_retried_once() {
        let store = Arc::new(FlakyStore::failing_warnings(1));
        let ledger = WarningLedger::new(store.clone());
        assert_eq!(ledger.add_violation(1, 2, at(0)).await, Some(1));

        let store = Arc::new(FlakyStore::failing_warnings(2));
        let ledger = WarningLedger::new(store);
        assert_eq!(ledger.add_violation(1, 2, at(0)).await, None);
    }
}
