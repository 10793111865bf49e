//! Metrics hooks for blob cache operations.
//!
//! Implement [`CacheMetrics`] to forward cache events to a monitoring
//! system, then attach it with
//! [`BlobCache::with_metrics`](crate::BlobCache::with_metrics):
//!
//! ```ignore
//! use redis_cache_kit::observability::CacheMetrics;
//! use std::time::Duration;
//!
//! struct PrometheusMetrics;
//!
//! impl CacheMetrics for PrometheusMetrics {
//!     fn record_hit(&self, _key: &str, _duration: Duration) {
//!         // counter!("blob_cache_hits").inc();
//!     }
//! }
//!
//! let cache = BlobCache::new(backend).with_metrics(Box::new(PrometheusMetrics));
//! ```
//!
//! Default method bodies log through the `log` crate. [`NoOpMetrics`] is
//! used when nothing is attached.

use std::time::Duration;

/// Trait for blob cache metrics collection.
pub trait CacheMetrics: Send + Sync {
    /// Record a `get` that found the key.
    fn record_hit(&self, key: &str, duration: Duration) {
        debug!("Cache HIT: {} took {:?}", key, duration);
    }

    /// Record a `get` that did not find the key.
    fn record_miss(&self, key: &str, duration: Duration) {
        debug!("Cache MISS: {} took {:?}", key, duration);
    }

    /// Record a `set`.
    fn record_set(&self, key: &str, duration: Duration) {
        debug!("Cache SET: {} took {:?}", key, duration);
    }

    /// Record a `refresh`; `extended` is false when nothing was re-armed.
    fn record_refresh(&self, key: &str, extended: bool, duration: Duration) {
        debug!(
            "Cache REFRESH: {} (extended: {}) took {:?}",
            key, extended, duration
        );
    }

    /// Record a `remove`.
    fn record_remove(&self, key: &str, duration: Duration) {
        debug!("Cache REMOVE: {} took {:?}", key, duration);
    }

    /// Record an error.
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
    fn record_refresh(&self, _key: &str, _extended: bool, _duration: Duration) {}
    fn record_remove(&self, _key: &str, _duration: Duration) {}
    fn record_error(&self, _key: &str, _error: &str) {}
}
