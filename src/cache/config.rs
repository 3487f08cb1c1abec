//! Named cache profiles.

use std::hash::Hash;
use std::time::Duration;

use moka::sync::Cache;

/// Capacity and expiry of one named cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub max_capacity: u64,
    pub ttl: Duration,
    /// Entries not read for this long are dropped before their ttl.
    pub tti: Option<Duration>,
}

impl CacheConfig {
    /// Resolved conversation policies, refreshed on every write.
    pub const POLICIES: Self = Self {
        max_capacity: 10_000,
        ttl: Duration::from_secs(5 * 60),
        tti: None,
    };

    /// Admin rights per (chat, user).
    pub const ADMINS: Self = Self {
        max_capacity: 10_000,
        ttl: Duration::from_secs(5 * 60),
        tti: Some(Duration::from_secs(2 * 60)),
    };

    pub(super) fn build<K, V>(&self) -> Cache<K, V>
    where
        K: Hash + Eq + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        let mut builder = Cache::builder()
            .max_capacity(self.max_capacity)
            .time_to_live(self.ttl);
        if let Some(tti) = self.tti {
            builder = builder.time_to_idle(tti);
        }
        builder.build()
    }
}
