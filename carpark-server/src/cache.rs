//! Time-to-live caches for aggregated upstream data.
//!
//! Each cached operation (directory, no-update set, locations view) owns
//! its own [`TtlCache`], so their lifetimes are independent and the three
//! views may briefly disagree after one of them refreshes.

use std::future::Future;
use std::hash::Hash;
use std::time::Duration;

use moka::future::Cache as MokaCache;
use moka::policy::EvictionPolicy;

/// Configuration shared by every cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for cached entries.
    pub ttl: Duration,

    /// Maximum number of cached entries.
    pub max_capacity: u64,
}

impl CacheConfig {
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        Self { ttl, max_capacity }
    }

    /// Set a custom TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60 * 60),
            max_capacity: 128,
        }
    }
}

/// A bounded cache whose entries expire a fixed time after insertion.
///
/// Once full, the least recently used entry is evicted first, not the
/// oldest inserted; moka offers no insertion-order policy. The two only
/// differ when entries are read out of insertion order, and each cache in
/// this crate holds a single key. Entries also expire by age regardless of
/// use. Concurrent misses on the same key are coalesced into a single
/// computation.
#[derive(Clone)]
pub struct TtlCache<K, V> {
    entries: MokaCache<K, V>,
}

impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a new cache with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        let entries = MokaCache::builder()
            .time_to_live(config.ttl)
            .max_capacity(config.max_capacity)
            .eviction_policy(EvictionPolicy::lru())
            .build();

        Self { entries }
    }

    /// Get an unexpired entry.
    pub async fn get(&self, key: &K) -> Option<V> {
        self.entries.get(key).await
    }

    /// Insert an entry, replacing any existing one.
    pub async fn insert(&self, key: K, value: V) {
        self.entries.insert(key, value).await;
    }

    /// Return the cached entry, or run `compute` and cache its result.
    ///
    /// A `None` result is returned to the caller but not cached, so the
    /// next call tries again.
    pub async fn get_or_compute<F>(&self, key: K, compute: F) -> Option<V>
    where
        F: Future<Output = Option<V>>,
    {
        self.entries.optionally_get_with(key, compute).await
    }

    /// Remove one entry.
    pub async fn invalidate(&self, key: &K) {
        self.entries.invalidate(key).await;
    }

    /// Invalidate all cached entries.
    pub fn invalidate_all(&self) {
        self.entries.invalidate_all();
    }

    /// Approximate number of entries (for monitoring).
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }
}
