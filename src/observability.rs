//! Observability hooks and TTL policies for the list cache.
//!
//! - **Metrics (`CacheMetrics`)**: hits, misses, writes, evictions, errors
//! - **TTL Policies (`TtlPolicy`)**: how long a cached list page lives
//!
//! The default metrics sink is `NoOpMetrics`; `CountingMetrics` keeps atomic
//! counters and is what the service installs so `/health` can report them.
//!
//! | Policy | Use Case |
//! |--------|----------|
//! | `Default` / `Infinite` | Keep pages until a write invalidates their tag |
//! | `Fixed` | Also expire pages after a fixed duration |
//! | `PerType` | Per-tag expiry (e.g. shorter for `eleveCache`) |

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Trait for cache metrics collection.
pub trait CacheMetrics: Send + Sync {
    fn record_hit(&self, key: &str, duration: Duration) {
        debug!("Cache HIT: {} took {:?}", key, duration);
    }

    fn record_miss(&self, key: &str, duration: Duration) {
        debug!("Cache MISS: {} took {:?}", key, duration);
    }

    fn record_set(&self, key: &str, duration: Duration) {
        debug!("Cache SET: {} took {:?}", key, duration);
    }

    /// Record the eviction of every key under a tag.
    fn record_invalidation(&self, tag: &str, evicted: usize) {
        debug!("Cache INVALIDATE tag {}: {} keys", tag, evicted);
    }

    fn record_error(&self, key: &str, error: &str) {
        warn!("Cache ERROR for {}: {}", key, error);
    }
}

/// Default metrics implementation (no-op).
#[derive(Clone, Default)]
pub struct NoOpMetrics;

impl CacheMetrics for NoOpMetrics {
    fn record_hit(&self, _key: &str, _duration: Duration) {}
    fn record_miss(&self, _key: &str, _duration: Duration) {}
    fn record_set(&self, _key: &str, _duration: Duration) {}
    fn record_invalidation(&self, _tag: &str, _evicted: usize) {}
    fn record_error(&self, _key: &str, _error: &str) {}
}

/// Metrics sink counting events with atomics; also logs like the default.
#[derive(Default)]
pub struct CountingMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    evictions: AtomicU64,
    errors: AtomicU64,
}

impl CountingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

impl CacheMetrics for CountingMetrics {
    fn record_hit(&self, key: &str, duration: Duration) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        debug!("Cache HIT: {} took {:?}", key, duration);
    }

    fn record_miss(&self, key: &str, duration: Duration) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!("Cache MISS: {} took {:?}", key, duration);
    }

    fn record_set(&self, key: &str, duration: Duration) {
        self.sets.fetch_add(1, Ordering::Relaxed);
        debug!("Cache SET: {} took {:?}", key, duration);
    }

    fn record_invalidation(&self, tag: &str, evicted: usize) {
        self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
        debug!("Cache INVALIDATE tag {}: {} keys", tag, evicted);
    }

    fn record_error(&self, key: &str, error: &str) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        warn!("Cache ERROR for {}: {}", key, error);
    }
}

/// Point-in-time copy of `CountingMetrics`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub evictions: u64,
    pub errors: u64,
}

/// TTL (Time-to-Live) policy for cache entries.
#[derive(Clone, Debug, Default)]
pub enum TtlPolicy {
    /// Use backend's default TTL
    #[default]
    Default,

    /// Fixed duration for all entries
    Fixed(Duration),

    /// No TTL (entries live until invalidated)
    Infinite,

    /// Custom per-tag policy
    PerType(fn(&str) -> Duration),
}

impl TtlPolicy {
    /// Build from the optional configured TTL.
    pub fn from_config(ttl: Option<Duration>) -> Self {
        match ttl {
            Some(d) => TtlPolicy::Fixed(d),
            None => TtlPolicy::Infinite,
        }
    }

    /// Get TTL for entries carrying `tag`.
    pub fn get_ttl(&self, tag: &str) -> Option<Duration> {
        match self {
            TtlPolicy::Default => None,
            TtlPolicy::Fixed(d) => Some(*d),
            TtlPolicy::Infinite => None,
            TtlPolicy::PerType(f) => Some(f(tag)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting_metrics() {
        let metrics = CountingMetrics::new();
        metrics.record_hit("k", Duration::from_millis(1));
        metrics.record_miss("k", Duration::from_millis(1));
        metrics.record_miss("k", Duration::from_millis(1));
        metrics.record_invalidation("eleveCache", 3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.hits, 1);
        assert_eq!(snapshot.misses, 2);
        assert_eq!(snapshot.evictions, 3);
        assert_eq!(snapshot.errors, 0);
    }

    #[test]
    fn test_ttl_policy_from_config() {
        assert_eq!(TtlPolicy::from_config(None).get_ttl("eleveCache"), None);
        assert_eq!(
            TtlPolicy::from_config(Some(Duration::from_secs(60))).get_ttl("eleveCache"),
            Some(Duration::from_secs(60))
        );
    }

    #[test]
    fn test_ttl_policy_per_type() {
        let policy = TtlPolicy::PerType(|tag| match tag {
            "eleveCache" => Duration::from_secs(30),
            _ => Duration::from_secs(600),
        });

        assert_eq!(policy.get_ttl("eleveCache"), Some(Duration::from_secs(30)));
        assert_eq!(policy.get_ttl("classeCache"), Some(Duration::from_secs(600)));
    }
}
