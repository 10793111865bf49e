//! In-memory store backend (default, thread-safe, async).
//!
//! Emulates the parts of the Redis keyspace the crate relies on: one
//! namespace holding strings, hashes and sets, per-key ttl, and publish /
//! subscribe channels. Uses DashMap for concurrent access with per-key
//! sharding. Expired keys are purged lazily on access.
//!
//! Deadlines use `tokio::time::Instant`, so tests running on a paused tokio
//! clock can advance time without sleeping.

use super::StoreBackend;
use crate::error::{Error, Result};
use dashmap::DashMap;
use futures::Stream;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;

/// Messages buffered per channel before slow subscribers start lagging.
const CHANNEL_CAPACITY: usize = 256;

enum Value {
    Bytes(Vec<u8>),
    Hash(HashMap<String, String>),
    Set(HashSet<String>),
}

impl Value {
    fn size(&self) -> usize {
        match self {
            Value::Bytes(data) => data.len(),
            Value::Hash(map) => map.iter().map(|(k, v)| k.len() + v.len()).sum(),
            Value::Set(set) => set.iter().map(String::len).sum(),
        }
    }
}

/// In-memory keyspace entry with optional expiration.
struct StoredValue {
    value: Value,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn new(value: Value, ttl: Option<Duration>) -> Self {
        let expires_at = ttl.map(|d| Instant::now() + d);
        StoredValue { value, expires_at }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Instant::now() >= exp)
    }
}

fn wrong_type(key: &str) -> Error {
    Error::BackendError(format!(
        "WRONGTYPE operation against key {} holding the wrong kind of value",
        key
    ))
}

/// Thread-safe async in-memory store backend.
///
/// Clones share the same keyspace and channels.
///
/// # Example
///
/// ```no_run
/// use redis_cache_kit::backend::{InMemoryBackend, StoreBackend};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let backend = InMemoryBackend::new();
///
///     backend.set("key1", b"value".to_vec(), None).await?;
///     backend.hash_set("roles", "1", "admin").await?;
///     backend.set("key2", b"expires".to_vec(), Some(Duration::from_secs(300))).await?;
///
///     assert!(backend.exists("key2").await?);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct InMemoryBackend {
    store: Arc<DashMap<String, StoredValue>>,
    channels: Arc<DashMap<String, broadcast::Sender<String>>>,
}

impl InMemoryBackend {
    /// Create a new, empty in-memory backend.
    pub fn new() -> Self {
        InMemoryBackend {
            store: Arc::new(DashMap::new()),
            channels: Arc::new(DashMap::new()),
        }
    }

    /// Get the current number of keys, including not-yet-purged expired keys.
    pub async fn len(&self) -> usize {
        self.store.len()
    }

    /// Check if the keyspace is empty.
    pub async fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Remaining time-to-live of `key`.
    ///
    /// `None` if the key is missing or has no expiration.
    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        self.purge_if_expired(key);
        self.store
            .get(key)
            .and_then(|entry| entry.expires_at)
            .map(|exp| exp.saturating_duration_since(Instant::now()))
    }

    /// Get memory statistics.
    pub async fn stats(&self) -> StoreStats {
        let total_bytes: usize = self.store.iter().map(|entry| entry.value.size()).sum();
        let expired_count = self.store.iter().filter(|entry| entry.is_expired()).count();

        StoreStats {
            total_keys: self.store.len(),
            expired_keys: expired_count,
            total_bytes,
            open_channels: self.channels.len(),
        }
    }

    /// Subscribe to `channel`.
    ///
    /// The stream yields every message published after this call. A
    /// subscriber that falls more than the channel capacity behind skips
    /// the lost messages.
    pub fn subscribe(&self, channel: &str) -> impl Stream<Item = String> + Send + 'static {
        let receiver = self
            .channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe();
        debug!("✓ InMemory SUBSCRIBE {}", channel);

        futures::stream::unfold(receiver, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(message) => return Some((message, rx)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("⚠ Subscriber lagged, {} messages skipped", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
    }

    fn purge_if_expired(&self, key: &str) {
        self.store.remove_if(key, |_, entry| entry.is_expired());
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreBackend for InMemoryBackend {
    async fn exists(&self, key: &str) -> Result<bool> {
        self.purge_if_expired(key);
        Ok(self.store.contains_key(key))
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.purge_if_expired(key);
        match self.store.get(key) {
            Some(entry) => match &entry.value {
                Value::Bytes(data) => {
                    debug!("✓ InMemory GET {} -> HIT", key);
                    Ok(Some(data.clone()))
                }
                _ => Err(wrong_type(key)),
            },
            None => {
                debug!("✓ InMemory GET {} -> MISS", key);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        self.store
            .insert(key.to_string(), StoredValue::new(Value::Bytes(value), ttl));

        if let Some(d) = ttl {
            debug!("✓ InMemory SET {} (TTL: {:?})", key, d);
        } else {
            debug!("✓ InMemory SET {}", key);
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.store.remove(key);
        debug!("✓ InMemory DELETE {}", key);
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        self.purge_if_expired(key);
        match self.store.get_mut(key) {
            Some(mut entry) => {
                entry.expires_at = Some(Instant::now() + ttl);
                debug!("✓ InMemory EXPIRE {} ({:?})", key, ttl);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mdelete(&self, keys: &[&str]) -> Result<()> {
        for key in keys {
            self.store.remove(*key);
        }
        debug!("✓ InMemory MDELETE {} keys", keys.len());
        Ok(())
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>> {
        self.purge_if_expired(key);
        match self.store.get(key) {
            Some(entry) => match &entry.value {
                Value::Hash(map) => Ok(map.clone()),
                _ => Err(wrong_type(key)),
            },
            None => Ok(HashMap::new()),
        }
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<()> {
        self.purge_if_expired(key);
        let mut entry = self
            .store
            .entry(key.to_string())
            .or_insert_with(|| StoredValue::new(Value::Hash(HashMap::new()), None));
        match &mut entry.value {
            Value::Hash(map) => {
                map.insert(field.to_string(), value.to_string());
                debug!("✓ InMemory HSET {} {}", key, field);
                Ok(())
            }
            _ => Err(wrong_type(key)),
        }
    }

    async fn hash_delete(&self, key: &str, field: &str) -> Result<()> {
        self.purge_if_expired(key);
        if let Some(mut entry) = self.store.get_mut(key) {
            match &mut entry.value {
                Value::Hash(map) => {
                    map.remove(field);
                }
                _ => return Err(wrong_type(key)),
            }
        }
        // Empty aggregates do not exist in Redis
        self.store
            .remove_if(key, |_, entry| matches!(&entry.value, Value::Hash(m) if m.is_empty()));
        debug!("✓ InMemory HDEL {} {}", key, field);
        Ok(())
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<()> {
        self.purge_if_expired(key);
        let mut entry = self
            .store
            .entry(key.to_string())
            .or_insert_with(|| StoredValue::new(Value::Set(HashSet::new()), None));
        match &mut entry.value {
            Value::Set(set) => {
                set.insert(member.to_string());
                Ok(())
            }
            _ => Err(wrong_type(key)),
        }
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<()> {
        self.purge_if_expired(key);
        if let Some(mut entry) = self.store.get_mut(key) {
            match &mut entry.value {
                Value::Set(set) => {
                    set.remove(member);
                }
                _ => return Err(wrong_type(key)),
            }
        }
        self.store
            .remove_if(key, |_, entry| matches!(&entry.value, Value::Set(s) if s.is_empty()));
        Ok(())
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>> {
        self.purge_if_expired(key);
        match self.store.get(key) {
            Some(entry) => match &entry.value {
                Value::Set(set) => Ok(set.iter().cloned().collect()),
                _ => Err(wrong_type(key)),
            },
            None => Ok(Vec::new()),
        }
    }

    async fn publish(&self, channel: &str, message: &str) -> Result<u64> {
        let receivers = match self.channels.get(channel) {
            // send fails only when there are no live receivers
            Some(sender) => sender.send(message.to_string()).unwrap_or(0),
            None => 0,
        };
        if receivers == 0 {
            // Every subscriber is gone; a later subscribe recreates the channel
            self.channels
                .remove_if(channel, |_, sender| sender.receiver_count() == 0);
        }
        debug!("✓ InMemory PUBLISH {} -> {} subscribers", channel, receivers);
        Ok(receivers as u64)
    }
}

/// Keyspace statistics.
#[derive(Clone, Debug)]
pub struct StoreStats {
    pub total_keys: usize,
    pub expired_keys: usize,
    pub total_bytes: usize,
    /// Channels with a sender still registered.
    pub open_channels: usize,
}
