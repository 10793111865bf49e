//! Store backend implementations.
//!
//! The blob cache and the entity store only speak to the store through
//! [`StoreBackend`], which mirrors the subset of Redis commands they need:
//! strings with ttl, hashes, sets and publish.

use crate::error::Result;
use std::collections::HashMap;
use std::time::Duration;

pub mod inmemory;
#[cfg(feature = "redis")]
pub mod redis;

pub use inmemory::InMemoryBackend;
#[cfg(feature = "redis")]
pub use redis::{PoolStats, RedisBackend};

/// Trait for store backend implementations.
///
/// **IMPORTANT:** All methods use `&self` to allow concurrent access.
/// Implementations hold shared state behind interior mutability or a
/// connection pool; a pooled connection is held only for one command.
///
/// **ASYNC:** All methods are async and must be awaited. Callers await each
/// command before issuing the next, so commands from one caller are never
/// reordered.
#[allow(async_fn_in_trait)]
pub trait StoreBackend: Send + Sync + Clone {
    /// Check whether `key` exists (of any type).
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Read a string value.
    ///
    /// # Returns
    /// - `Ok(Some(bytes))` - Value found
    /// - `Ok(None)` - Key not found
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs or the key holds another type
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write a string value, replacing any previous value and ttl.
    ///
    /// `ttl: None` stores the value without expiration.
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()>;

    /// Remove a key of any type.
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs
    async fn delete(&self, key: &str) -> Result<()>;

    /// Set the remaining time-to-live of an existing key.
    ///
    /// Returns `false` if the key does not exist.
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool>;

    /// Bulk get operation.
    ///
    /// Default implementation calls `get()` for each key.
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs
    async fn mget(&self, keys: &[&str]) -> Result<Vec<Option<Vec<u8>>>> {
        let mut results = Vec::with_capacity(keys.len());
        for key in keys {
            results.push(self.get(key).await?);
        }
        Ok(results)
    }

    /// Bulk delete operation.
    ///
    /// Default implementation calls `delete()` for each key.
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs
    async fn mdelete(&self, keys: &[&str]) -> Result<()> {
        for key in keys {
            self.delete(key).await?;
        }
        Ok(())
    }

    /// Read every field/value pair of a hash. Missing key → empty map.
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs or the key holds another type
    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>>;

    /// Write one hash field.
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs or the key holds another type
    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<()>;

    /// Remove one hash field.
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs or the key holds another type
    async fn hash_delete(&self, key: &str, field: &str) -> Result<()>;

    /// Add a member to a set.
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs or the key holds another type
    async fn set_add(&self, key: &str, member: &str) -> Result<()>;

    /// Remove a member from a set.
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs or the key holds another type
    async fn set_remove(&self, key: &str, member: &str) -> Result<()>;

    /// All members of a set, in no particular order. Missing key → empty.
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs or the key holds another type
    async fn set_members(&self, key: &str) -> Result<Vec<String>>;

    /// Publish a message; returns the number of subscribers that received it.
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs
    async fn publish(&self, channel: &str, message: &str) -> Result<u64>;

    /// Health check - verify backend is accessible.
    ///
    /// # Errors
    /// Returns `Err` if backend is not accessible
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}
