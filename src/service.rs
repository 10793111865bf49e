//! Registration entry point for application code.
//!
//! Bundles a [`BlobCache`] and an [`EntityStore`] over one backend behind
//! `Arc`s so the pair can be cloned into request handlers freely.

use crate::backend::StoreBackend;
use crate::blob::BlobCache;
use crate::observability::CacheMetrics;
use crate::store::EntityStore;
use std::sync::Arc;

#[cfg(feature = "redis")]
use crate::backend::RedisBackend;
#[cfg(feature = "redis")]
use crate::config::CacheOptions;
#[cfg(feature = "redis")]
use crate::error::Result;

/// Shared handle to both cache surfaces.
///
/// Both surfaces talk to the same backend; clones share them.
///
/// # Example
///
/// ```
/// use redis_cache_kit::{CacheService, EntryOptions, RefreshableCache};
/// use redis_cache_kit::backend::InMemoryBackend;
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> redis_cache_kit::Result<()> {
/// let cache = CacheService::new(InMemoryBackend::new());
///
/// let options = EntryOptions::default().with_sliding_expiration(Duration::from_secs(60));
/// cache.blobs().set("greeting", b"hello".to_vec(), &options).await?;
/// assert_eq!(cache.blobs().get("greeting").await?, Some(b"hello".to_vec()));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CacheService<B: StoreBackend> {
    blobs: Arc<BlobCache<B>>,
    entities: Arc<EntityStore<B>>,
}

impl<B: StoreBackend> CacheService<B> {
    /// Create a new cache service with the given backend.
    pub fn new(backend: B) -> Self {
        CacheService {
            blobs: Arc::new(BlobCache::new(backend.clone())),
            entities: Arc::new(EntityStore::new(backend)),
        }
    }

    /// Create a new cache service whose blob cache reports to `metrics`.
    pub fn with_metrics(backend: B, metrics: Box<dyn CacheMetrics>) -> Self {
        CacheService {
            blobs: Arc::new(BlobCache::new(backend.clone()).with_metrics(metrics)),
            entities: Arc::new(EntityStore::new(backend)),
        }
    }

    /// Byte cache with expiration and refresh.
    pub fn blobs(&self) -> &BlobCache<B> {
        &self.blobs
    }

    /// Typed entity store with secondary indexes.
    pub fn entities(&self) -> &EntityStore<B> {
        &self.entities
    }

    /// Get backend reference (for advanced use).
    pub fn backend(&self) -> &B {
        self.entities.backend()
    }
}

#[cfg(feature = "redis")]
impl CacheService<RedisBackend> {
    /// Build a Redis-backed service from `options`.
    ///
    /// Connections are opened lazily, so an unreachable server surfaces on
    /// the first operation.
    ///
    /// # Errors
    /// Returns `Error::ConfigError` if the connection pool cannot be built.
    pub fn connect(options: &CacheOptions) -> Result<Self> {
        let backend = RedisBackend::new(options)?;
        Ok(CacheService::new(backend))
    }

    /// Build a Redis-backed service from options adjusted by `setup`.
    ///
    /// ```no_run
    /// # use redis_cache_kit::CacheService;
    /// let cache = CacheService::configure(|o| {
    ///     o.host = "cache.internal".to_string();
    ///     o.password = Some("s3cret".to_string());
    /// })?;
    /// # Ok::<(), redis_cache_kit::Error>(())
    /// ```
    ///
    /// # Errors
    /// Same as [`connect`](Self::connect).
    pub fn configure<F>(setup: F) -> Result<Self>
    where
        F: FnOnce(&mut CacheOptions),
    {
        Self::connect(&CacheOptions::configure(setup))
    }

    /// Build a Redis-backed service from the named section of a JSON
    /// configuration document.
    ///
    /// # Errors
    /// Returns `Error::ConfigError` if the section is missing or malformed,
    /// or if the pool cannot be built.
    pub fn from_section(root: &serde_json::Value, section: &str) -> Result<Self> {
        let options = CacheOptions::from_section(root, section)?.with_env_overrides();
        Self::connect(&options)
    }
}
