//! Size-bounded LRU cache with per-entry time-to-live.

use super::stats::{CacheCounters, CacheStats};
use ::lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
struct TtlEntry<V> {
    value: V,
    inserted_at: Instant,
}

/// LRU cache whose entries also expire a fixed time after insertion.
///
/// When a new key arrives at a full cache, the oldest `eviction_fraction`
/// of entries by insertion time (at least one) are evicted in one batch
/// before the insert. Expired entries read as misses and are dropped on
/// access; `sweep_expired` removes the rest.
pub struct TtlCache<K, V> {
    name: &'static str,
    inner: Mutex<LruCache<K, TtlEntry<V>>>,
    capacity: usize,
    ttl: Duration,
    eviction_fraction: f64,
    counters: CacheCounters,
}

impl<K: Hash + Eq + Clone, V: Clone> TtlCache<K, V> {
    pub fn new(name: &'static str, capacity: usize, ttl: Duration, eviction_fraction: f64) -> Self {
        let capacity = capacity.max(1);
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            name,
            inner: Mutex::new(LruCache::new(cap)),
            capacity,
            ttl,
            eviction_fraction: eviction_fraction.clamp(0.0, 1.0),
            counters: CacheCounters::default(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let Ok(mut cache) = self.inner.lock() else {
            self.counters.miss();
            return None;
        };

        let expired = match cache.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                self.counters.hit();
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            cache.pop(key);
            self.counters.expired(1);
        }
        self.counters.miss();
        None
    }

    pub fn insert(&self, key: K, value: V) {
        let Ok(mut cache) = self.inner.lock() else {
            return;
        };

        if !cache.contains(&key) && cache.len() >= self.capacity {
            let evicted = self.evict_oldest(&mut cache);
            debug!(cache = self.name, evicted, "cache full, evicted oldest entries");
        }

        cache.put(
            key,
            TtlEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Evict the oldest share of entries by insertion time.
    fn evict_oldest(&self, cache: &mut LruCache<K, TtlEntry<V>>) -> usize {
        let len = cache.len();
        let target = ((len as f64 * self.eviction_fraction).ceil() as usize).clamp(1, len);

        let mut by_age: Vec<(Instant, K)> = cache
            .iter()
            .map(|(key, entry)| (entry.inserted_at, key.clone()))
            .collect();
        by_age.sort_by_key(|(inserted_at, _)| *inserted_at);

        for (_, key) in by_age.into_iter().take(target) {
            cache.pop(&key);
        }
        self.counters.evicted(target);
        target
    }

    /// Remove every expired entry. Returns the number removed.
    pub fn sweep_expired(&self) -> usize {
        let Ok(mut cache) = self.inner.lock() else {
            return 0;
        };

        let expired: Vec<K> = cache
            .iter()
            .filter(|(_, entry)| entry.inserted_at.elapsed() >= self.ttl)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            cache.pop(key);
        }
        self.counters.expired(expired.len());
        expired.len()
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.inner
            .lock()
            .ok()
            .and_then(|mut cache| cache.pop(key))
            .map(|entry| entry.value)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|cache| cache.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        if let Ok(mut cache) = self.inner.lock() {
            cache.clear();
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot(self.len())
    }
}

impl<K, V> std::fmt::Debug for TtlCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = TtlCache::new("test", 10, Duration::from_secs(60), 0.25);
        cache.insert("k", 1);
        assert_eq!(cache.get(&"k"), Some(1));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.get(&"k"), None);
        assert!(cache.is_empty());
        assert_eq!(cache.stats().expirations, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overflow_evicts_oldest_quarter() {
        let cache = TtlCache::new("test", 8, Duration::from_secs(3600), 0.25);
        for i in 0..8u32 {
            cache.insert(i, i);
            tokio::time::advance(Duration::from_millis(10)).await;
        }
        // Touching the oldest entries does not save them: eviction is by age.
        assert_eq!(cache.get(&0), Some(0));
        assert_eq!(cache.get(&1), Some(1));

        cache.insert(100, 100);

        assert_eq!(cache.len(), 7);
        assert_eq!(cache.get(&0), None);
        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.get(&2), Some(2));
        assert_eq!(cache.get(&100), Some(100));
        assert_eq!(cache.stats().evictions, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_at_capacity_does_not_evict() {
        let cache = TtlCache::new("test", 2, Duration::from_secs(60), 0.25);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("a", 3);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"a"), Some(3));
        assert_eq!(cache.stats().evictions, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_small_cache_evicts_at_least_one() {
        let cache = TtlCache::new("test", 1, Duration::from_secs(60), 0.25);
        cache.insert("a", 1);
        cache.insert("b", 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"b"), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_expired() {
        let cache = TtlCache::new("test", 10, Duration::from_secs(30), 0.25);
        cache.insert("old", 1);
        tokio::time::advance(Duration::from_secs(20)).await;
        cache.insert("new", 2);
        tokio::time::advance(Duration::from_secs(15)).await;

        assert_eq!(cache.sweep_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"new"), Some(2));
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// The size cap holds after every insert regardless of key pattern.
        #[test]
        fn prop_cap_enforced_on_every_insert(
            capacity in 1usize..32,
            fraction in 0.2f64..0.3,
            keys in proptest::collection::vec(0u16..128, 0..300),
        ) {
            let cache = TtlCache::new("prop", capacity, Duration::from_secs(3600), fraction);
            for key in keys {
                cache.insert(key, ());
                prop_assert!(cache.len() <= capacity);
            }
        }
    }
}
