//! In-process memory and negative cache tiers, LRU-evicted, modeled on the
//! teacher's memory cache backend but narrowed to the one eviction strategy
//! this engine needs.

use crate::key::CacheKey;
use lru::LruCache;
use parking_lot::RwLock;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// LRU cache of resolved tile bytes.
pub struct MemoryTier {
    cache: RwLock<LruCache<CacheKey, Arc<Vec<u8>>>>,
}

impl MemoryTier {
    /// Build a tier with the given entry capacity.
    pub fn new(capacity: u64) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1) as usize).unwrap();
        Self {
            cache: RwLock::new(LruCache::new(capacity)),
        }
    }

    /// Look up a key, refreshing its recency on hit.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<Vec<u8>>> {
        self.cache.write().get(key).cloned()
    }

    /// Insert or overwrite an entry.
    pub fn put(&self, key: CacheKey, bytes: Arc<Vec<u8>>) {
        self.cache.write().put(key, bytes);
    }

    /// Remove an entry, if present.
    pub fn remove(&self, key: &CacheKey) {
        self.cache.write().pop(key);
    }
}

/// Negative cache: remembers keys that resolved to "absent" for a bounded TTL,
/// so repeated misses for genuinely-missing tiles skip disk and generation.
pub struct NegativeTier {
    cache: RwLock<LruCache<CacheKey, Instant>>,
    ttl: Duration,
}

impl NegativeTier {
    /// Build a tier with the given key capacity and TTL.
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1) as usize).unwrap();
        Self {
            cache: RwLock::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// `true` if `key` is remembered absent and the entry has not expired.
    /// An expired entry is evicted as a side effect.
    pub fn contains_fresh(&self, key: &CacheKey) -> bool {
        let mut cache = self.cache.write();
        match cache.get(key) {
            Some(at) if at.elapsed() < self.ttl => true,
            Some(_) => {
                cache.pop(key);
                false
            }
            None => false,
        }
    }

    /// Record `key` as absent, timestamped now.
    pub fn mark_absent(&self, key: CacheKey) {
        self.cache.write().put(key, Instant::now());
    }

    /// Remove an entry, if present.
    pub fn remove(&self, key: &CacheKey) {
        self.cache.write().pop(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(x: i64) -> CacheKey {
        CacheKey::new("t".into(), "m".into(), 0, x, 0)
    }

    #[test]
    fn test_memory_tier_hit_and_miss() {
        let tier = MemoryTier::new(2);
        assert!(tier.get(&key(1)).is_none());
        tier.put(key(1), Arc::new(vec![1, 2, 3]));
        assert_eq!(*tier.get(&key(1)).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_memory_tier_evicts_lru() {
        let tier = MemoryTier::new(1);
        tier.put(key(1), Arc::new(vec![1]));
        tier.put(key(2), Arc::new(vec![2]));
        assert!(tier.get(&key(1)).is_none());
        assert!(tier.get(&key(2)).is_some());
    }

    #[test]
    fn test_negative_tier_fresh_and_expired() {
        let tier = NegativeTier::new(10, Duration::from_millis(20));
        tier.mark_absent(key(1));
        assert!(tier.contains_fresh(&key(1)));
        std::thread::sleep(Duration::from_millis(30));
        assert!(!tier.contains_fresh(&key(1)));
    }

    #[test]
    fn test_negative_tier_remove() {
        let tier = NegativeTier::new(10, Duration::from_secs(60));
        tier.mark_absent(key(1));
        tier.remove(&key(1));
        assert!(!tier.contains_fresh(&key(1)));
    }
}
