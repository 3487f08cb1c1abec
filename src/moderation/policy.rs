//! Policy resolver.
//!
//! Never fails toward "no policy": storage errors fall back to the
//! last-known-good copy, then to the built-in defaults.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::cache::{CacheConfig, CacheRegistry, TypedCache};
use crate::database::{ConversationPolicy, ModerationStore, StoreResult};

pub struct PolicyResolver {
    store: Arc<dyn ModerationStore>,
    hot: TypedCache<i64, ConversationPolicy>,
    last_good: DashMap<i64, ConversationPolicy>,
}

impl PolicyResolver {
    pub fn new(store: Arc<dyn ModerationStore>, cache: &CacheRegistry) -> Self {
        let hot = cache.get_or_create("policies", CacheConfig::POLICIES);

        Self {
            store,
            hot,
            last_good: DashMap::new(),
        }
    }

    pub async fn get(&self, chat_id: i64) -> ConversationPolicy {
        if let Some(policy) = self.hot.get(&chat_id) {
            return policy;
        }

        match self.store.load_policy(chat_id).await {
            Ok(Some(policy)) => {
                self.remember(&policy);
                policy
            }
            Ok(None) => {
                let policy = ConversationPolicy::defaults(chat_id);
                match self.store.save_policy(&policy).await {
                    Ok(()) => {
                        info!("Created default policy for {}", chat_id);
                        self.remember(&policy);
                    }
                    Err(e) => warn!("Failed to persist default policy for {}: {}", chat_id, e),
                }
                policy
            }
            Err(e) => {
                warn!("Policy load failed for {}: {}", chat_id, e);
                match self.last_good.get(&chat_id) {
                    Some(policy) => {
                        debug!("Using last known policy for {}", chat_id);
                        policy.clone()
                    }
                    None => ConversationPolicy::defaults(chat_id),
                }
            }
        }
    }

    /// Persist a changed policy and refresh the cached copies.
    pub async fn update(&self, policy: ConversationPolicy) -> StoreResult<()> {
        self.store.save_policy(&policy).await?;
        self.remember(&policy);
        Ok(())
    }

    fn remember(&self, policy: &ConversationPolicy) {
        self.hot.insert(policy.chat_id, policy.clone());
        self.last_good.insert(policy.chat_id, policy.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::moderation::testing::FlakyStore;

    #[tokio::test]
    async fn test_unseen_chat_persists_defaults() {
        let store = Arc::new(MemoryStore::new());
        let resolver = PolicyResolver::new(store.clone(), &CacheRegistry::new());

        let policy = resolver.get(-100).await;
        assert_eq!(policy, ConversationPolicy::defaults(-100));
        assert_eq!(store.load_policy(-100).await.unwrap(), Some(policy));
    }

    #[tokio::test]
    async fn test_storage_failure_falls_back_to_defaults() {
        let resolver = PolicyResolver::new(Arc::new(FlakyStore::down()), &CacheRegistry::new());
        let policy = resolver.get(-100).await;
        assert!(policy.enabled);
        assert!(policy.challenge_enabled);
        assert_eq!(policy.max_warnings, 3);
    }

    #[tokio::test]
    async fn test_update_refreshes_cache() {
        let store = Arc::new(MemoryStore::new());
        let resolver = PolicyResolver::new(store, &CacheRegistry::new());

        let mut policy = resolver.get(-100).await;
        policy.enabled = false;
        resolver.update(policy).await.unwrap();

        assert!(!resolver.get(-100).await.enabled);
    }
}
