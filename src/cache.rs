//! Tag-aware cache for serialized list pages.
//!
//! Wraps a `CacheBackend` with a secondary `tag -> keys` index so a whole
//! family of entries (every cached page of one resource) can be evicted at
//! once:
//!
//! ```ignore
//! let cache = TagAwareCache::new(InMemoryBackend::new());
//!
//! let json = cache
//!     .get("getEleve-1-10-ROLE_USER", &["eleveCache"], || async {
//!         render_page().await
//!     })
//!     .await?;
//!
//! // after any write to eleve
//! cache.invalidate_tags(&["eleveCache"]).await?;
//! ```
//!
//! There is no single-flight guarantee: two concurrent misses on one key both
//! run `populate`, and the last `set` wins.
//!
//! Each tag carries a generation counter bumped by `invalidate_tags`. A miss
//! whose tags were invalidated while it was rendering still answers its own
//! request, but the page it stored is evicted again, so the next read
//! recomputes.

use crate::backend::CacheBackend;
use crate::envelope::{deserialize_from_cache, serialize_for_cache};
use crate::error::Result;
use crate::observability::{CacheMetrics, NoOpMetrics, TtlPolicy};
use dashmap::DashMap;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

/// Cache of JSON strings whose entries are grouped under tags.
///
/// Clones share the backend, the tag index and the metrics sink.
#[derive(Clone)]
pub struct TagAwareCache<B: CacheBackend> {
    backend: B,
    tags: Arc<DashMap<String, HashSet<String>>>,
    generations: Arc<DashMap<String, u64>>,
    metrics: Arc<dyn CacheMetrics>,
    ttl_policy: TtlPolicy,
}

impl<B: CacheBackend> TagAwareCache<B> {
    pub fn new(backend: B) -> Self {
        TagAwareCache {
            backend,
            tags: Arc::new(DashMap::new()),
            generations: Arc::new(DashMap::new()),
            metrics: Arc::new(NoOpMetrics),
            ttl_policy: TtlPolicy::default(),
        }
    }

    /// Set custom metrics handler.
    pub fn with_metrics(mut self, metrics: Arc<dyn CacheMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Set custom TTL policy.
    pub fn with_ttl_policy(mut self, policy: TtlPolicy) -> Self {
        self.ttl_policy = policy;
        self
    }

    /// Return the cached value for `key`, computing it with `populate` on a miss.
    ///
    /// On a miss the computed value is stored and indexed under every tag in
    /// `tags`. Entries that fail envelope validation are evicted and treated as
    /// a miss.
    ///
    /// # Errors
    ///
    /// Propagates errors from `populate` (nothing is cached then) and from the
    /// backend.
    pub async fn get<F, Fut>(&self, key: &str, tags: &[&str], populate: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        let timer = Instant::now();

        if let Some(bytes) = self.backend.get(key).await? {
            match deserialize_from_cache::<String>(&bytes) {
                Ok(value) => {
                    self.metrics.record_hit(key, timer.elapsed());
                    return Ok(value);
                }
                Err(e) => {
                    self.metrics.record_error(key, &e.to_string());
                    self.backend.delete(key).await?;
                }
            }
        }

        self.metrics.record_miss(key, timer.elapsed());

        let generation = self.generation(tags);
        let value = populate().await?;
        self.store(key, tags, &value).await?;

        if self.generation(tags) != generation {
            debug!("Tags of {} invalidated while rendering, evicting", key);
            self.evict(key, tags).await?;
        }
        Ok(value)
    }

    /// Store `value` under `key` and index it under `tags`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if encoding or the backend write fails.
    pub async fn store(&self, key: &str, tags: &[&str], value: &str) -> Result<()> {
        let timer = Instant::now();
        let bytes = serialize_for_cache(&value)?;
        let ttl = tags
            .first()
            .and_then(|tag| self.ttl_policy.get_ttl(tag));

        // Indexed only once written, so an invalidation racing the write
        // still finds the key afterwards.
        self.backend.set(key, bytes, ttl).await?;
        for tag in tags {
            self.tags
                .entry((*tag).to_string())
                .or_default()
                .insert(key.to_string());
        }

        self.metrics.record_set(key, timer.elapsed());
        Ok(())
    }

    /// Evict every entry indexed under any of `tags`.
    ///
    /// Unknown tags and already-evicted keys are skipped, so repeating an
    /// invalidation is harmless.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the backend fails to delete.
    pub async fn invalidate_tags(&self, tags: &[&str]) -> Result<()> {
        for tag in tags {
            *self.generations.entry((*tag).to_string()).or_insert(0) += 1;

            let Some((_, keys)) = self.tags.remove(*tag) else {
                self.metrics.record_invalidation(tag, 0);
                continue;
            };

            let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
            self.backend.mdelete(&keys).await?;
            self.metrics.record_invalidation(tag, keys.len());
            debug!("Invalidated tag {} ({} keys)", tag, keys.len());
        }
        Ok(())
    }

    /// Sum of the generations of `tags`; changes whenever any of them is
    /// invalidated.
    fn generation(&self, tags: &[&str]) -> u64 {
        tags.iter()
            .map(|tag| self.generations.get(*tag).map(|g| *g).unwrap_or(0))
            .sum()
    }

    async fn evict(&self, key: &str, tags: &[&str]) -> Result<()> {
        for tag in tags {
            if let Some(mut keys) = self.tags.get_mut(*tag) {
                keys.remove(key);
            }
        }
        self.backend.delete(key).await
    }

    /// Number of keys currently indexed under `tag`.
    pub fn tagged_keys(&self, tag: &str) -> usize {
        self.tags.get(tag).map(|keys| keys.len()).unwrap_or(0)
    }

    /// Get backend reference (for advanced use).
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_populate_runs_once() {
        let cache = TagAwareCache::new(InMemoryBackend::new());
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        for _ in 0..3 {
            let value = cache
                .get("getEleve-1-10-ROLE_USER", &["eleveCache"], move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("[1,2]".to_string())
                })
                .await
                .expect("get failed");
            assert_eq!(value, "[1,2]");
        }

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(cache.tagged_keys("eleveCache"), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_recompute() {
        let cache = TagAwareCache::new(InMemoryBackend::new());

        cache
            .get("getClasses-1-10-ROLE_USER", &["classeCache"], || async {
                Ok("old".to_string())
            })
            .await
            .unwrap();

        cache.invalidate_tags(&["classeCache"]).await.unwrap();

        let value = cache
            .get("getClasses-1-10-ROLE_USER", &["classeCache"], || async {
                Ok("new".to_string())
            })
            .await
            .unwrap();
        assert_eq!(value, "new");
    }

    #[tokio::test]
    async fn test_invalidate_leaves_other_tags() {
        let cache = TagAwareCache::new(InMemoryBackend::new());

        cache
            .get("getEleve-1-10-ROLE_USER", &["eleveCache"], || async {
                Ok("eleves".to_string())
            })
            .await
            .unwrap();
        cache
            .get("getClasses-1-10-ROLE_USER", &["classeCache"], || async {
                Ok("classes".to_string())
            })
            .await
            .unwrap();

        cache.invalidate_tags(&["eleveCache"]).await.unwrap();

        assert!(!cache
            .backend()
            .exists("getEleve-1-10-ROLE_USER")
            .await
            .unwrap());
        assert!(cache
            .backend()
            .exists("getClasses-1-10-ROLE_USER")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_invalidate_is_idempotent() {
        let cache = TagAwareCache::new(InMemoryBackend::new());
        cache.invalidate_tags(&["professeurCache"]).await.unwrap();
        cache.invalidate_tags(&["professeurCache"]).await.unwrap();
        assert_eq!(cache.tagged_keys("professeurCache"), 0);
    }

    #[tokio::test]
    async fn test_populate_error_is_not_cached() {
        let cache = TagAwareCache::new(InMemoryBackend::new());

        let result = cache
            .get("getEleve-1-10-ROLE_USER", &["eleveCache"], || async {
                Err(Error::BackendError("store down".to_string()))
            })
            .await;
        assert!(result.is_err());
        assert!(cache.backend().is_empty());
        assert_eq!(cache.tagged_keys("eleveCache"), 0);
    }

    #[tokio::test]
    async fn test_corrupted_entry_is_recomputed() {
        let backend = InMemoryBackend::new();
        backend
            .set("getEleve-1-10-ROLE_USER", b"garbage".to_vec(), None)
            .await
            .unwrap();
        let cache = TagAwareCache::new(backend);

        let value = cache
            .get("getEleve-1-10-ROLE_USER", &["eleveCache"], || async {
                Ok("fresh".to_string())
            })
            .await
            .unwrap();
        assert_eq!(value, "fresh");
    }
}
