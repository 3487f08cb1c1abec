//! Typed, named handle over a moka cache.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use moka::sync::Cache;

use super::CacheConfig;

/// Clones share the same entries.
#[derive(Clone)]
pub struct TypedCache<K, V> {
    name: Arc<str>,
    entries: Cache<K, V>,
}

impl<K, V> TypedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(name: impl Into<Arc<str>>, config: CacheConfig) -> Self {
        Self {
            name: name.into(),
            entries: config.build(),
        }
    }

    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(key, value);
    }

    /// Live entry for `key`, if any.
    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.get(key)
    }
}

impl<K, V> fmt::Debug for TypedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypedCache({}, {} entries)", self.name, self.entries.entry_count())
    }
}
