//! In-memory cache implementation with LRU eviction.
//!
//! Entries expire lazily: an expired entry reads as a miss and is dropped
//! on that read.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::Mutex;

use dealflow_core::cache::{pattern_matches, Cache, Result};

/// A single cache entry with optional expiration.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn new(value: Vec<u8>, ttl: Option<Duration>) -> Self {
        let expires_at = ttl.map(|d| Instant::now() + d);
        Self { value, expires_at }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }
}

/// In-memory cache with LRU eviction and per-entry TTL.
///
/// Cloning is cheap; clones share the same store.
#[derive(Debug, Clone)]
pub struct MemoryCache {
    store: Arc<Mutex<LruCache<String, CacheEntry>>>,
}

impl MemoryCache {
    /// Creates a cache holding at most `max_entries` values.
    ///
    /// A zero capacity is raised to one.
    pub fn new(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            store: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    /// Number of entries currently held, expired ones included.
    pub async fn len(&self) -> usize {
        self.store.lock().await.len()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        // `LruCache::get` updates recency, so reads need exclusive access.
        let mut store = self.store.lock().await;
        let now = Instant::now();

        match store.get(key) {
            Some(entry) if entry.is_expired(now) => {
                store.pop(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        let mut store = self.store.lock().await;
        store.put(key.to_string(), CacheEntry::new(value.to_vec(), ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.store.lock().await.pop(key);
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<()> {
        let mut store = self.store.lock().await;
        let keys_to_delete: Vec<String> = store
            .iter()
            .filter(|(key, _)| pattern_matches(pattern, key))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &keys_to_delete {
            store.pop(key);
        }
        tracing::trace!(pattern, removed = keys_to_delete.len(), "Cache pattern delete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealflow_core::cache::{fund_allocations_key, fund_key, fund_pattern};
    use uuid::Uuid;

    const TEST_MAX_ENTRIES: usize = 1000;

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = MemoryCache::new(TEST_MAX_ENTRIES);
        cache.set("deal:1", b"acme", None).await.unwrap();

        assert_eq!(cache.get("deal:1").await.unwrap(), Some(b"acme".to_vec()));
        assert_eq!(cache.get("deal:2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete() {
        let cache = MemoryCache::new(TEST_MAX_ENTRIES);
        cache.set("deal:1", b"acme", None).await.unwrap();

        cache.delete("deal:1").await.unwrap();
        assert!(cache.get("deal:1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ttl_expiration() {
        let cache = MemoryCache::new(TEST_MAX_ENTRIES);
        cache
            .set("fund:1", b"short-lived", Some(Duration::from_millis(50)))
            .await
            .unwrap();
        assert!(cache.get("fund:1").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(cache.get("fund:1").await.unwrap().is_none());
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_lru_eviction() {
        let cache = MemoryCache::new(2);
        cache.set("a", b"1", None).await.unwrap();
        cache.set("b", b"2", None).await.unwrap();

        // Touch "a" so "b" becomes least recently used.
        cache.get("a").await.unwrap();
        cache.set("c", b"3", None).await.unwrap();

        assert!(cache.get("a").await.unwrap().is_some());
        assert!(cache.get("b").await.unwrap().is_none());
        assert!(cache.get("c").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_zero_capacity_still_caches() {
        let cache = MemoryCache::new(0);
        cache.set("a", b"1", None).await.unwrap();
        assert!(cache.get("a").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_pattern_removes_one_fund() {
        let cache = MemoryCache::new(TEST_MAX_ENTRIES);
        let fund = Uuid::new_v4();
        let other = Uuid::new_v4();

        cache.set(&fund_key(fund), b"f", None).await.unwrap();
        cache
            .set(&fund_allocations_key(fund), b"[]", None)
            .await
            .unwrap();
        cache
            .set(&fund_allocations_key(other), b"[]", None)
            .await
            .unwrap();

        cache.delete_pattern(&fund_pattern(fund)).await.unwrap();

        assert!(cache
            .get(&fund_allocations_key(fund))
            .await
            .unwrap()
            .is_none());
        assert!(cache
            .get(&fund_allocations_key(other))
            .await
            .unwrap()
            .is_some());
    }
}
