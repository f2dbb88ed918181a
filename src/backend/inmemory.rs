//! In-memory cache backend (default, thread-safe, async).
//!
//! Uses DashMap for concurrent access with per-key sharding.
//! Expired entries are dropped lazily, on access.

use super::CacheBackend;
use crate::error::Result;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

struct CacheEntry {
    data: Vec<u8>,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn new(data: Vec<u8>, ttl: Option<Duration>) -> Self {
        let expires_at = ttl.map(|d| Instant::now() + d);
        CacheEntry { data, expires_at }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Instant::now() > exp)
    }
}

/// Thread-safe in-memory cache backend.
///
/// Clones share the same store, so one backend can be handed to every request
/// handler.
#[derive(Clone)]
pub struct InMemoryBackend {
    store: Arc<DashMap<String, CacheEntry>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        InMemoryBackend {
            store: Arc::new(DashMap::new()),
        }
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let total_bytes: usize = self.store.iter().map(|entry| entry.data.len()).sum();
        let expired_count = self.store.iter().filter(|entry| entry.is_expired()).count();

        CacheStats {
            total_entries: self.store.len(),
            expired_entries: expired_count,
            total_bytes,
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheBackend for InMemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        if let Some(entry) = self.store.get(key) {
            if !entry.is_expired() {
                debug!("InMemory GET {} -> HIT", key);
                return Ok(Some(entry.data.clone()));
            }
        }

        // The read guard above is released before removing. Only an expired
        // entry is dropped; a concurrent `set` may have replaced it.
        self.store.remove_if(key, |_, entry| entry.is_expired());
        debug!("InMemory GET {} -> MISS", key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        self.store.insert(key.to_string(), CacheEntry::new(value, ttl));

        match ttl {
            Some(d) => debug!("InMemory SET {} (TTL: {:?})", key, d),
            None => debug!("InMemory SET {}", key),
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.store.remove(key);
        debug!("InMemory DELETE {}", key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self
            .store
            .get(key)
            .map(|entry| !entry.is_expired())
            .unwrap_or(false))
    }

    async fn mdelete(&self, keys: &[&str]) -> Result<()> {
        for key in keys {
            self.store.remove(*key);
        }
        debug!("InMemory MDELETE {} keys", keys.len());
        Ok(())
    }
}

/// Cache statistics.
#[derive(Clone, Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub total_bytes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_inmemory_backend_set_get() {
        let backend = InMemoryBackend::new();

        backend
            .set("getClasses-1-10-ROLE_USER", b"[]".to_vec(), None)
            .await
            .expect("Failed to set");

        let result = backend
            .get("getClasses-1-10-ROLE_USER")
            .await
            .expect("Failed to get");
        assert_eq!(result, Some(b"[]".to_vec()));
    }

    #[tokio::test]
    async fn test_inmemory_backend_miss() {
        let backend = InMemoryBackend::new();
        let result = backend.get("nonexistent").await.expect("Failed to get");
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_inmemory_backend_delete_missing_is_noop() {
        let backend = InMemoryBackend::new();
        backend.delete("never-set").await.expect("delete must not fail");
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_inmemory_backend_ttl_expiration() {
        let backend = InMemoryBackend::new();

        backend
            .set("key1", b"value1".to_vec(), Some(Duration::from_millis(50)))
            .await
            .expect("Failed to set");
        assert!(backend.get("key1").await.expect("Failed to get").is_some());

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(backend.get("key1").await.expect("Failed to get").is_none());
        // Lazy eviction removed the entry on access.
        assert_eq!(backend.len(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_inmemory_backend_miss_keeps_concurrent_set() {
        let backend = InMemoryBackend::new();

        for i in 0..500 {
            let key = format!("getEleve-{}-10-ROLE_USER", i);
            let reader = {
                let backend = backend.clone();
                let key = key.clone();
                tokio::spawn(async move { backend.get(&key).await })
            };
            let writer = {
                let backend = backend.clone();
                let key = key.clone();
                tokio::spawn(async move { backend.set(&key, b"[]".to_vec(), None).await })
            };
            reader.await.unwrap().unwrap();
            writer.await.unwrap().unwrap();

            assert!(backend.exists(&key).await.unwrap(), "{} was dropped", key);
        }
    }

    #[tokio::test]
    async fn test_inmemory_backend_replaced_entry_survives_miss_path() {
        let backend = InMemoryBackend::new();
        backend
            .set("key1", b"old".to_vec(), Some(Duration::from_millis(20)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        backend.set("key1", b"new".to_vec(), None).await.unwrap();
        assert!(backend.get("missing").await.unwrap().is_none());
        assert_eq!(backend.get("key1").await.unwrap(), Some(b"new".to_vec()));
        assert_eq!(backend.len(), 1);
    }

    #[tokio::test]
    async fn test_inmemory_backend_mdelete() {
        let backend = InMemoryBackend::new();
        for key in ["a", "b", "c"] {
            backend
                .set(key, key.as_bytes().to_vec(), None)
                .await
                .expect("Failed to set");
        }

        backend.mdelete(&["a", "b"]).await.expect("Failed to mdelete");

        assert_eq!(backend.len(), 1);
        assert!(backend.get("c").await.expect("Failed to get").is_some());
    }

    #[tokio::test]
    async fn test_inmemory_backend_stats() {
        let backend = InMemoryBackend::new();
        backend
            .set("key1", b"value_with_data".to_vec(), None)
            .await
            .expect("Failed to set");

        let stats = backend.stats();
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.expired_entries, 0);
        assert_eq!(stats.total_bytes, 15);
    }

    #[tokio::test]
    async fn test_inmemory_backend_clone_shares_store() {
        let backend1 = InMemoryBackend::new();
        let backend2 = backend1.clone();

        backend1
            .set("key", b"value".to_vec(), None)
            .await
            .expect("Failed to set");

        assert_eq!(
            backend2.get("key").await.expect("Failed to get"),
            Some(b"value".to_vec())
        );
    }
}
