//! Byte-blob cache with sliding and absolute expiration.
//!
//! Entries written with a non-zero ttl are shadowed by an expiration record
//! holding the ttl in seconds. `refresh` reads that record and re-arms the
//! entry with the window it was written with.
//!
//! ```text
//! set(k, v, ttl=d)   SETEX k d v ; SETEX k-expiration d "d"
//! set(k, v, none)    SET k v ; DEL k-expiration
//! refresh(k)         EXISTS k ; GET k-expiration ; EXPIRE k d ; EXPIRE k-expiration d
//! remove(k)          DEL k k-expiration
//! ```
//!
//! The two writes of `set` are not atomic. A failure between them leaves the
//! primary entry in place without a record, so later refreshes have no
//! effect on it; the entry itself is never lost.

use crate::backend::StoreBackend;
use crate::error::{Error, Result};
use crate::expiration::{self, EntryOptions};
use crate::key::KeyBuilder;
use crate::observability::{CacheMetrics, NoOpMetrics};
use std::time::{Duration, Instant};

/// Generic refreshable byte cache contract.
///
/// # Errors
///
/// Every method fails with `Error::InvalidArgument` for an empty key, before
/// the store is contacted, and propagates store failures unchanged.
#[allow(async_fn_in_trait)]
pub trait RefreshableCache {
    /// Read the payload stored under `key`; `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `value` under `key` with the given expiration.
    async fn set(&self, key: &str, value: Vec<u8>, options: &EntryOptions) -> Result<()>;

    /// Re-arm the sliding window of `key`. No-op if absent or non-expiring.
    async fn refresh(&self, key: &str) -> Result<()>;

    /// Remove `key`.
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Byte-blob cache over a [`StoreBackend`].
///
/// # Example
///
/// ```ignore
/// use redis_cache_kit::{BlobCache, EntryOptions, RefreshableCache};
/// use redis_cache_kit::backend::InMemoryBackend;
///
/// let cache = BlobCache::new(InMemoryBackend::new());
/// let options = EntryOptions::default().with_sliding_expiration(Duration::from_secs(60));
///
/// cache.set("session:1", b"token".to_vec(), &options).await?;
/// cache.refresh("session:1").await?; // another 60s
/// ```
pub struct BlobCache<B: StoreBackend> {
    backend: B,
    metrics: Box<dyn CacheMetrics>,
}

impl<B: StoreBackend> BlobCache<B> {
    /// Create a blob cache over `backend`.
    pub fn new(backend: B) -> Self {
        BlobCache {
            backend,
            metrics: Box::new(NoOpMetrics),
        }
    }

    /// Set custom metrics handler.
    pub fn with_metrics(mut self, metrics: Box<dyn CacheMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Get backend reference (for advanced use).
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn check_key(key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(Error::InvalidArgument("key must not be empty".to_string()));
        }
        Ok(())
    }

    fn observe<T>(&self, key: &str, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            self.metrics.record_error(key, &e.to_string());
        }
        result
    }

    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        // EXISTS first so an empty payload is not mistaken for a miss
        if !self.backend.exists(key).await? {
            return Ok(None);
        }
        self.backend.get(key).await
    }

    async fn write(&self, key: &str, value: Vec<u8>, ttl_seconds: u64) -> Result<()> {
        let record_key = KeyBuilder::expiration(key);
        if ttl_seconds == 0 {
            self.backend.set(key, value, None).await?;
            // A record left by an earlier expiring write would re-arm this entry
            return self.backend.delete(&record_key).await;
        }

        let ttl = Duration::from_secs(ttl_seconds);
        self.backend.set(key, value, Some(ttl)).await?;
        self.backend
            .set(
                &record_key,
                expiration::encode_record(ttl_seconds),
                Some(ttl),
            )
            .await
    }

    /// Returns whether the entry was re-armed.
    async fn touch(&self, key: &str) -> Result<bool> {
        if !self.backend.exists(key).await? {
            debug!("Refresh skipped, {} is absent", key);
            return Ok(false);
        }

        let record_key = KeyBuilder::expiration(key);
        let record = match self.backend.get(&record_key).await? {
            Some(record) => record,
            None => {
                debug!("Refresh skipped, {} has no expiration record", key);
                return Ok(false);
            }
        };

        let ttl = Duration::from_secs(expiration::decode_record(&record_key, &record)?);
        let extended = self.backend.expire(key, ttl).await?;
        // The record is re-armed with its own value so the window keeps sliding
        self.backend.expire(&record_key, ttl).await?;

        debug!("✓ Refreshed {} for {:?}", key, ttl);
        Ok(extended)
    }
}

impl<B: StoreBackend> RefreshableCache for BlobCache<B> {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Self::check_key(key)?;
        let timer = Instant::now();

        let result = self.read(key).await;
        if let Ok(value) = &result {
            match value {
                Some(_) => self.metrics.record_hit(key, timer.elapsed()),
                None => self.metrics.record_miss(key, timer.elapsed()),
            }
        }
        self.observe(key, result)
    }

    async fn set(&self, key: &str, value: Vec<u8>, options: &EntryOptions) -> Result<()> {
        Self::check_key(key)?;
        let ttl_seconds = options.ttl_seconds()?;
        let timer = Instant::now();

        let result = self.write(key, value, ttl_seconds).await;
        if result.is_ok() {
            self.metrics.record_set(key, timer.elapsed());
        }
        self.observe(key, result)
    }

    async fn refresh(&self, key: &str) -> Result<()> {
        Self::check_key(key)?;
        let timer = Instant::now();

        let result = self.touch(key).await;
        if let Ok(extended) = result {
            self.metrics.record_refresh(key, extended, timer.elapsed());
        }
        self.observe(key, result.map(|_| ()))
    }

    async fn remove(&self, key: &str) -> Result<()> {
        Self::check_key(key)?;
        let timer = Instant::now();

        let record_key = KeyBuilder::expiration(key);
        let result = self.backend.mdelete(&[key, record_key.as_str()]).await;
        if result.is_ok() {
            self.metrics.record_remove(key, timer.elapsed());
        }
        self.observe(key, result)
    }
}
