//! Redis store backend implementation.

use super::StoreBackend;
use crate::config::CacheOptions;
use crate::error::{Error, Result};
use deadpool_redis::redis::AsyncCommands;
use deadpool_redis::{Config as PoolConfig, Connection, Pool, Runtime};
use std::collections::HashMap;
use std::time::Duration;

/// Pool statistics information.
#[derive(Debug, Clone)]
pub struct PoolStats {
    pub connections: u32,
    pub idle_connections: u32,
}

/// Redis backend with connection pooling and async operations.
///
/// Uses deadpool for async connection pooling. Every command checks a
/// connection out of the pool and returns it when the command completes or
/// fails. Clones share the pool.
///
/// # Example
///
/// ```no_run
/// # use redis_cache_kit::backend::{RedisBackend, StoreBackend};
/// # use redis_cache_kit::{CacheOptions, Result};
/// # async fn example() -> Result<()> {
/// let backend = RedisBackend::new(&CacheOptions::default())?;
///
/// backend.set("key", b"value".to_vec(), None).await?;
/// let value = backend.get("key").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RedisBackend {
    pool: Pool,
}

impl RedisBackend {
    /// Create new Redis backend from options.
    ///
    /// Connections are opened lazily on first use.
    ///
    /// # Errors
    /// Returns `Err` if pool creation fails.
    pub fn new(options: &CacheOptions) -> Result<Self> {
        let mut pool_config = deadpool_redis::PoolConfig::new(options.pool_size as usize);
        pool_config.timeouts.wait = Some(options.connection_timeout());

        let mut cfg = PoolConfig::from_url(options.connection_string());
        cfg.pool = Some(pool_config);

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| Error::ConfigError(format!("Failed to create Redis pool: {}", e)))?;

        info!(
            "✓ Redis backend initialized: {}:{} (pool size: {})",
            options.host, options.port, options.pool_size
        );

        Ok(RedisBackend { pool })
    }

    /// Create from connection string directly.
    ///
    /// Pool size is determined by:
    /// 1. `REDIS_POOL_SIZE` environment variable (if set)
    /// 2. `DEFAULT_POOL_SIZE` constant (16)
    ///
    /// # Errors
    /// Returns `Err` if pool creation fails.
    pub fn from_connection_string(conn_str: &str) -> Result<Self> {
        let pool_size = CacheOptions::default().with_env_overrides().pool_size;

        let mut cfg = PoolConfig::from_url(conn_str);
        cfg.pool = Some(deadpool_redis::PoolConfig::new(pool_size as usize));

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| Error::ConfigError(format!("Failed to create Redis pool: {}", e)))?;

        info!(
            "✓ Redis backend initialized from connection string (pool size: {})",
            pool_size
        );

        Ok(RedisBackend { pool })
    }

    /// Get current pool statistics.
    pub fn pool_stats(&self) -> PoolStats {
        let status = self.pool.status();
        PoolStats {
            connections: status.size as u32,
            idle_connections: status.available as u32,
        }
    }

    async fn connection(&self) -> Result<Connection> {
        Ok(self.pool.get().await?)
    }
}

impl StoreBackend for RedisBackend {
    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection().await?;

        let exists: bool = conn.exists(key).await.map_err(|e| {
            Error::BackendError(format!("Redis EXISTS failed for key {}: {}", key, e))
        })?;

        Ok(exists)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.connection().await?;

        let value: Option<Vec<u8>> = conn
            .get(key)
            .await
            .map_err(|e| Error::BackendError(format!("Redis GET failed for key {}: {}", key, e)))?;

        if value.is_some() {
            debug!("✓ Redis GET {} -> HIT", key);
        } else {
            debug!("✓ Redis GET {} -> MISS", key);
        }

        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.connection().await?;

        match ttl {
            Some(duration) => {
                // SETEX rejects 0
                let seconds = duration.as_secs().max(1);
                conn.set_ex::<_, _, ()>(key, value, seconds)
                    .await
                    .map_err(|e| {
                        Error::BackendError(format!("Redis SETEX failed for key {}: {}", key, e))
                    })?;
                debug!("✓ Redis SET {} (TTL: {}s)", key, seconds);
            }
            None => {
                conn.set::<_, _, ()>(key, value).await.map_err(|e| {
                    Error::BackendError(format!("Redis SET failed for key {}: {}", key, e))
                })?;
                debug!("✓ Redis SET {}", key);
            }
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection().await?;

        conn.del::<_, ()>(key)
            .await
            .map_err(|e| Error::BackendError(format!("Redis DEL failed for key {}: {}", key, e)))?;

        debug!("✓ Redis DELETE {}", key);
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.connection().await?;

        let seconds = ttl.as_secs().max(1) as i64;
        let applied: bool = conn.expire(key, seconds).await.map_err(|e| {
            Error::BackendError(format!("Redis EXPIRE failed for key {}: {}", key, e))
        })?;

        debug!("✓ Redis EXPIRE {} ({}s) -> {}", key, seconds, applied);
        Ok(applied)
    }

    async fn mget(&self, keys: &[&str]) -> Result<Vec<Option<Vec<u8>>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.connection().await?;

        // Explicit MGET: a single-key GET would not reply with an array
        let values: Vec<Option<Vec<u8>>> = deadpool_redis::redis::cmd("MGET")
            .arg(keys)
            .query_async(&mut *conn)
            .await
            .map_err(|e| Error::BackendError(format!("Redis MGET failed: {}", e)))?;

        debug!("✓ Redis MGET {} keys", keys.len());
        Ok(values)
    }

    async fn mdelete(&self, keys: &[&str]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let mut conn = self.connection().await?;

        conn.del::<_, ()>(keys)
            .await
            .map_err(|e| Error::BackendError(format!("Redis DEL (bulk) failed: {}", e)))?;

        debug!("✓ Redis MDELETE {} keys", keys.len());
        Ok(())
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>> {
        let mut conn = self.connection().await?;

        let entries: HashMap<String, String> = conn.hgetall(key).await.map_err(|e| {
            Error::BackendError(format!("Redis HGETALL failed for key {}: {}", key, e))
        })?;

        debug!("✓ Redis HGETALL {} -> {} entries", key, entries.len());
        Ok(entries)
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<()> {
        let mut conn = self.connection().await?;

        conn.hset::<_, _, _, ()>(key, field, value)
            .await
            .map_err(|e| {
                Error::BackendError(format!("Redis HSET failed for key {}: {}", key, e))
            })?;

        debug!("✓ Redis HSET {} {}", key, field);
        Ok(())
    }

    async fn hash_delete(&self, key: &str, field: &str) -> Result<()> {
        let mut conn = self.connection().await?;

        conn.hdel::<_, _, ()>(key, field).await.map_err(|e| {
            Error::BackendError(format!("Redis HDEL failed for key {}: {}", key, e))
        })?;

        debug!("✓ Redis HDEL {} {}", key, field);
        Ok(())
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<()> {
        let mut conn = self.connection().await?;

        conn.sadd::<_, _, ()>(key, member).await.map_err(|e| {
            Error::BackendError(format!("Redis SADD failed for key {}: {}", key, e))
        })?;

        Ok(())
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<()> {
        let mut conn = self.connection().await?;

        conn.srem::<_, _, ()>(key, member).await.map_err(|e| {
            Error::BackendError(format!("Redis SREM failed for key {}: {}", key, e))
        })?;

        Ok(())
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>> {
        let mut conn = self.connection().await?;

        let members: Vec<String> = conn.smembers(key).await.map_err(|e| {
            Error::BackendError(format!("Redis SMEMBERS failed for key {}: {}", key, e))
        })?;

        Ok(members)
    }

    async fn publish(&self, channel: &str, message: &str) -> Result<u64> {
        let mut conn = self.connection().await?;

        let receivers: u64 = conn.publish(channel, message).await.map_err(|e| {
            Error::BackendError(format!("Redis PUBLISH failed on {}: {}", channel, e))
        })?;

        debug!("✓ Redis PUBLISH {} -> {} subscribers", channel, receivers);
        Ok(receivers)
    }

    async fn health_check(&self) -> Result<bool> {
        let mut conn = self.connection().await?;

        let pong: String = deadpool_redis::redis::cmd("PING")
            .query_async(&mut *conn)
            .await
            .map_err(|e| Error::BackendError(format!("Redis PING failed: {}", e)))?;

        Ok(pong == "PONG" || pong.contains("PONG"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_redis_backend_new_is_lazy() {
        // Pool creation does not connect, so this succeeds without a server
        let backend = RedisBackend::new(&CacheOptions::default()).expect("pool should build");
        let stats = backend.pool_stats();
        assert_eq!(stats.connections, 0);
    }

    #[tokio::test]
    async fn test_redis_backend_unreachable_fails_as_backend_error() {
        let options = CacheOptions::configure(|o| {
            o.host = "127.0.0.1".to_string();
            o.port = 1;
            o.connection_timeout_secs = 1;
        });
        let backend = RedisBackend::new(&options).expect("pool should build");

        let err = backend.get("anything").await.unwrap_err();
        assert!(matches!(err, Error::BackendError(_)), "got {:?}", err);
    }

    #[test]
    fn test_redis_backend_rejects_bad_url() {
        let result = RedisBackend::from_connection_string("not a url");
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }
}
