//! Size-bounded LRU cache.

use super::stats::{CacheCounters, CacheStats};
use ::lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Mutex;

/// Thread-safe LRU cache with a hard entry cap.
///
/// The cap holds after every insert: inserting a new key into a full cache
/// evicts the least-recently-used entry first. A poisoned lock degrades to
/// a miss (reads) or a no-op (writes).
pub struct BoundedLruCache<K, V> {
    name: &'static str,
    inner: Mutex<LruCache<K, V>>,
    counters: CacheCounters,
}

impl<K: Hash + Eq + Clone, V: Clone> BoundedLruCache<K, V> {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            name,
            inner: Mutex::new(LruCache::new(cap)),
            counters: CacheCounters::default(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Look up a key, promoting it to most-recently-used.
    pub fn get(&self, key: &K) -> Option<V> {
        let Ok(mut cache) = self.inner.lock() else {
            self.counters.miss();
            return None;
        };
        match cache.get(key) {
            Some(value) => {
                self.counters.hit();
                Some(value.clone())
            }
            None => {
                self.counters.miss();
                None
            }
        }
    }

    pub fn put(&self, key: K, value: V) {
        let Ok(mut cache) = self.inner.lock() else {
            return;
        };
        if let Some((evicted_key, _)) = cache.push(key.clone(), value) {
            if evicted_key != key {
                self.counters.evicted(1);
            }
        }
    }

    /// Apply `f` to the cached value in place, if present. Does not count as
    /// a hit or miss.
    pub fn update<F: FnOnce(&mut V)>(&self, key: &K, f: F) -> bool {
        let Ok(mut cache) = self.inner.lock() else {
            return false;
        };
        match cache.peek_mut(key) {
            Some(value) => {
                f(value);
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.inner.lock().ok().and_then(|mut cache| cache.pop(key))
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner
            .lock()
            .map(|cache| cache.contains(key))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|cache| cache.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner
            .lock()
            .map(|cache| cache.cap().get())
            .unwrap_or(0)
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

impl<K, V> std::fmt::Debug for BoundedLruCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedLruCache")
            .field("name", &self.name)
            .finish()
    }
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// The size cap holds after every insert.
        #[test]
        fn prop_cap_enforced_on_every_insert(
            capacity in 1usize..16,
            keys in proptest::collection::vec(0u16..64, 0..200),
        ) {
            let cache = BoundedLruCache::new("prop", capacity);
            for key in keys {
                cache.put(key, key);
                prop_assert!(cache.len() <= capacity);
            }
        }
    }
}
