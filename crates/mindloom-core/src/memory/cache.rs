//! Bounded TTL cache for hot session documents.
//!
//! Expiry is lazy: entries are checked on access and purged when a write
//! finds the cache full, so the cache needs no background task and no
//! runtime to construct.

use dashmap::DashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

struct CacheEntry<V> {
    value: V,
    created_at: Instant,
    access_count: u64,
}

/// Cache configuration.
#[derive(Clone, Debug)]
pub struct CacheConfig {
    /// Maximum entries.
    pub max_entries: usize,
    /// Entry TTL.
    pub ttl: Duration,
    /// Whether the cache is enabled.
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1_000,
            ttl: Duration::from_secs(60),
            enabled: true,
        }
    }
}

/// Basic cache with TTL and eviction.
pub struct Cache<K, V> {
    data: DashMap<K, CacheEntry<V>>,
    config: CacheConfig,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(config: CacheConfig) -> Self {
        Self {
            data: DashMap::new(),
            config,
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        if !self.config.enabled {
            return None;
        }

        let expired = match self.data.get_mut(key) {
            Some(mut entry) => {
                if entry.created_at.elapsed() > self.config.ttl {
                    true
                } else {
                    entry.access_count += 1;
                    return Some(entry.value.clone());
                }
            }
            None => return None,
        };

        if expired {
            self.data.remove(key);
        }
        None
    }

    pub fn set(&self, key: K, value: V) {
        if !self.config.enabled {
            return;
        }

        if self.data.len() >= self.config.max_entries {
            self.cleanup_expired();
        }
        if self.data.len() >= self.config.max_entries {
            self.evict_one();
        }

        self.data.insert(
            key,
            CacheEntry {
                value,
                created_at: Instant::now(),
                access_count: 0,
            },
        );
    }

    pub fn remove(&self, key: &K) {
        self.data.remove(key);
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn evict_one(&self) {
        let mut min_key: Option<K> = None;
        let mut min_count = u64::MAX;
        for entry in self.data.iter() {
            if entry.access_count < min_count {
                min_count = entry.access_count;
                min_key = Some(entry.key().clone());
            }
        }

        if let Some(key) = min_key {
            self.data.remove(&key);
        }
    }

    fn cleanup_expired(&self) {
        self.data
            .retain(|_, entry| entry.created_at.elapsed() <= self.config.ttl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let cache: Cache<String, u32> = Cache::new(CacheConfig::default());
        cache.set("a".to_string(), 1);
        assert_eq!(cache.get(&"a".to_string()), Some(1));

        cache.remove(&"a".to_string());
        assert_eq!(cache.get(&"a".to_string()), None);
    }

    #[test]
    fn test_disabled_cache_stores_nothing() {
        let cache: Cache<String, u32> = Cache::new(CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        });
        cache.set("a".to_string(), 1);
        assert_eq!(cache.get(&"a".to_string()), None);
    }

    #[test]
    fn test_ttl_expiry() {
        let cache: Cache<String, u32> = Cache::new(CacheConfig {
            ttl: Duration::from_millis(0),
            ..CacheConfig::default()
        });
        cache.set("a".to_string(), 1);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get(&"a".to_string()), None);
    }

    #[test]
    fn test_bounded_size() {
        let cache: Cache<u32, u32> = Cache::new(CacheConfig {
            max_entries: 3,
            ..CacheConfig::default()
        });
        for i in 0..10 {
            cache.set(i, i);
        }
        assert!(cache.len() <= 3);
    }
}
