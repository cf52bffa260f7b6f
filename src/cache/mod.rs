//! Caching layer for policy decisions.
//!
//! Decisions are keyed by the digest of the request attributes. Any change
//! to policies or content clears the cache.

use crate::api::PolicyDecision;

use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// A cache for policy decisions.
pub struct DecisionCache {
    entries: Mutex<LruCache<String, CachedDecision>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// A cached decision with expiration time.
struct CachedDecision {
    decision: PolicyDecision,
    expires_at: Instant,
}

impl DecisionCache {
    /// Create a new decision cache.
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Get a cached decision for the given request key.
    pub fn get(&self, key: &str) -> Option<PolicyDecision> {
        let mut cache = self.entries.lock();

        if let Some(cached) = cache.get(key) {
            if cached.expires_at > Instant::now() {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(cached.decision.clone());
            }
            cache.pop(key);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Cache a decision for the given request key.
    pub fn put(&self, key: String, decision: &PolicyDecision) {
        let cached = CachedDecision {
            decision: decision.clone(),
            expires_at: Instant::now() + self.ttl,
        };

        self.entries.lock().put(key, cached);
    }

    /// Clear all cached entries.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        CacheStats {
            hits,
            misses,
            size: self.entries.lock().len(),
            hit_rate,
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Current cache size
    pub size: usize,
    /// Hit rate percentage
    pub hit_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::DecisionType;
    use crate::Error;
    use std::thread;

    fn decision() -> PolicyDecision {
        PolicyDecision::indeterminate(Error::missing_value("x"))
    }

    #[test]
    fn test_cache_put_get() {
        let cache = DecisionCache::new(100, Duration::from_secs(60));

        cache.put("k1".to_string(), &decision());

        let cached = cache.get("k1");
        assert!(cached.is_some());
        assert_eq!(cached.unwrap().decision, DecisionType::Indeterminate);
    }

    #[test]
    fn test_cache_miss() {
        let cache = DecisionCache::new(100, Duration::from_secs(60));

        assert!(cache.get("k1").is_none());

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);
    }

    #[test]
    fn test_cache_expiration() {
        let cache = DecisionCache::new(100, Duration::from_millis(50));

        cache.put("k1".to_string(), &decision());
        assert!(cache.get("k1").is_some());

        thread::sleep(Duration::from_millis(100));

        assert!(cache.get("k1").is_none());
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn test_cache_eviction() {
        let cache = DecisionCache::new(2, Duration::from_secs(60));

        cache.put("a".to_string(), &decision());
        cache.put("b".to_string(), &decision());
        cache.get("a");
        cache.put("c".to_string(), &decision());

        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
        assert_eq!(cache.stats().size, 2);
    }

    #[test]
    fn test_zero_capacity() {
        let cache = DecisionCache::new(0, Duration::from_secs(60));
        cache.put("a".to_string(), &decision());
        assert_eq!(cache.stats().size, 1);
    }

    #[test]
    fn test_cache_clear_and_stats() {
        let cache = DecisionCache::new(100, Duration::from_secs(60));

        cache.put("k1".to_string(), &decision());
        cache.get("k1");
        cache.get("k2");

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
        assert_eq!(stats.hit_rate, 50.0);

        cache.clear();
        assert!(cache.get("k1").is_none());
    }
}
