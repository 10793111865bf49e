//! Integration tests for redis-cache-kit
//!
//! End-to-end behavior of the blob cache and the entity store over the
//! in-memory backend. Expiration tests run on a paused tokio clock.

use redis_cache_kit::backend::{InMemoryBackend, StoreBackend};
use redis_cache_kit::{
    CacheService, EntryOptions, Error, IndexSpec, RefreshableCache, Result, StoreEntity,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
struct User {
    id: String,
    name: String,
    role: String,
    age: u32,
}

impl StoreEntity for User {
    fn entity_id(&self) -> String {
        self.id.clone()
    }

    fn collection() -> &'static str {
        "user"
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
struct Product {
    sku: String,
    price: f64,
}

impl StoreEntity for Product {
    fn entity_id(&self) -> String {
        self.sku.clone()
    }

    fn collection() -> &'static str {
        "product"
    }

    fn validate(&self) -> Result<()> {
        if self.price < 0.0 {
            return Err(Error::ValidationError("negative price".to_string()));
        }
        Ok(())
    }
}

fn user(id: &str, role: &str, age: u32) -> User {
    User {
        id: id.to_string(),
        name: format!("User {}", id),
        role: role.to_string(),
        age,
    }
}

fn by_role() -> IndexSpec<User> {
    IndexSpec::derived("roles", |u: &User| u.role.clone())
}

fn ids(mut users: Vec<User>) -> Vec<String> {
    users.sort_by(|a, b| a.id.cmp(&b.id));
    users.into_iter().map(|u| u.id).collect()
}

fn sliding(secs: u64) -> EntryOptions {
    EntryOptions::default().with_sliding_expiration(Duration::from_secs(secs))
}

// ============================================================================
// Blob cache
// ============================================================================

#[tokio::test]
async fn test_blob_round_trip_no_expiration() {
    let cache = CacheService::new(InMemoryBackend::new());

    cache
        .blobs()
        .set("k1", vec![1, 2, 3], &EntryOptions::no_expiration())
        .await
        .expect("Failed to set");

    let value = cache.blobs().get("k1").await.expect("Failed to get");
    assert_eq!(value, Some(vec![1, 2, 3]));
    // No expiration record for permanent entries
    assert!(!cache
        .backend()
        .exists("k1-expiration")
        .await
        .expect("EXISTS failed"));
}

#[tokio::test(start_paused = true)]
async fn test_blob_sliding_window_kept_alive_by_refresh() {
    let cache = CacheService::new(InMemoryBackend::new());
    cache
        .blobs()
        .set("session", b"payload".to_vec(), &sliding(2))
        .await
        .expect("Failed to set");

    // Five refreshes one second apart outlive the two-second window
    for _ in 0..5 {
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.blobs().refresh("session").await.expect("Failed to refresh");
    }
    assert!(cache.blobs().get("session").await.expect("get").is_some());

    tokio::time::advance(Duration::from_secs(3)).await;
    assert!(cache.blobs().get("session").await.expect("get").is_none());
    // The record expires with the primary
    assert!(!cache
        .backend()
        .exists("session-expiration")
        .await
        .expect("EXISTS failed"));
}

#[tokio::test(start_paused = true)]
async fn test_blob_absolute_relative_expires() {
    let cache = CacheService::new(InMemoryBackend::new());
    let options =
        EntryOptions::default().with_absolute_expiration_relative_to_now(Duration::from_secs(10));
    cache
        .blobs()
        .set("report", b"data".to_vec(), &options)
        .await
        .expect("Failed to set");

    tokio::time::advance(Duration::from_secs(9)).await;
    assert!(cache.blobs().get("report").await.expect("get").is_some());

    tokio::time::advance(Duration::from_secs(2)).await;
    assert!(cache.blobs().get("report").await.expect("get").is_none());
}

#[tokio::test]
async fn test_blob_absolute_instant_in_past_rejected() {
    let cache = CacheService::new(InMemoryBackend::new());
    let past = SystemTime::now() - Duration::from_secs(60);
    let options = EntryOptions::default().with_absolute_expiration(past);

    let result = cache.blobs().set("late", b"x".to_vec(), &options).await;
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
    assert!(cache.backend().is_empty().await);
}

#[tokio::test]
async fn test_blob_remove_clears_entry_and_record() {
    let cache = CacheService::new(InMemoryBackend::new());
    cache
        .blobs()
        .set("tmp", b"x".to_vec(), &sliding(60))
        .await
        .expect("Failed to set");

    cache.blobs().remove("tmp").await.expect("Failed to remove");

    assert!(cache.blobs().get("tmp").await.expect("get").is_none());
    assert!(cache.backend().is_empty().await);

    // Removing again is a no-op
    cache.blobs().remove("tmp").await.expect("Failed to remove");
}

#[tokio::test]
async fn test_blob_refresh_malformed_record_is_hard_failure() {
    let backend = InMemoryBackend::new();
    let cache = CacheService::new(backend.clone());
    cache
        .blobs()
        .set("k", b"v".to_vec(), &sliding(30))
        .await
        .expect("Failed to set");

    backend
        .set("k-expiration", b"soon".to_vec(), None)
        .await
        .expect("Failed to corrupt record");

    let result = cache.blobs().refresh("k").await;
    match result {
        Err(Error::InvalidExpiration { key, value }) => {
            assert_eq!(key, "k-expiration");
            assert_eq!(value, "soon");
        }
        other => panic!("expected InvalidExpiration, got {:?}", other),
    }
}

// ============================================================================
// Entity store
// ============================================================================

#[tokio::test]
async fn test_entity_lookup_ignores_case() {
    let cache = CacheService::new(InMemoryBackend::new());
    let alice = user("Alice-01", "admin", 30);
    cache.entities().set(&alice).await.expect("Failed to set");

    let fetched: Option<User> = cache
        .entities()
        .get_by_id("ALICE-01")
        .await
        .expect("Failed to get");
    assert_eq!(fetched, Some(alice));
}

#[tokio::test]
async fn test_entity_roles_index() {
    let cache = CacheService::new(InMemoryBackend::new());
    let users = vec![
        user("1", "admin", 25),
        user("2", "user", 40),
        user("3", "Admin", 50),
    ];
    cache
        .entities()
        .set_all_indexed(&users, &[by_role()])
        .await
        .expect("Failed to set_all_indexed");

    let admins: Vec<User> = cache
        .entities()
        .get_all_by_index("roles", "ADMIN")
        .await
        .expect("Failed to query");
    assert_eq!(ids(admins), vec!["1", "3"]);

    let older_admins: Vec<User> = cache
        .entities()
        .get_all_by_index_filtered("roles", "admin", |u: &User| u.age > 30)
        .await
        .expect("Failed to query");
    assert_eq!(ids(older_admins), vec!["3"]);
}

#[tokio::test]
async fn test_entity_zip_index_specs() {
    let cache = CacheService::new(InMemoryBackend::new());
    let specs = IndexSpec::<User>::zip(&["teams", "regions"], &["Core", "EU"])
        .expect("Failed to zip");
    cache
        .entities()
        .set_indexed(&user("7", "user", 22), &specs)
        .await
        .expect("Failed to set_indexed");

    let core: Vec<User> = cache
        .entities()
        .get_all_by_index("teams", "core")
        .await
        .expect("Failed to query");
    assert_eq!(ids(core), vec!["7"]);
}

#[tokio::test]
async fn test_entity_collections_are_isolated() {
    let cache = CacheService::new(InMemoryBackend::new());
    cache
        .entities()
        .set(&user("1", "admin", 30))
        .await
        .expect("Failed to set user");
    cache
        .entities()
        .set(&Product {
            sku: "1".to_string(),
            price: 9.5,
        })
        .await
        .expect("Failed to set product");

    cache
        .entities()
        .delete_all(&user("anyone", "x", 0))
        .await
        .expect("Failed to delete_all");

    let users: Vec<User> = cache.entities().get_all().await.expect("get_all");
    let products: Vec<Product> = cache.entities().get_all().await.expect("get_all");
    assert!(users.is_empty());
    assert_eq!(products.len(), 1);
}

#[tokio::test]
async fn test_entity_validation_on_read() {
    let cache = CacheService::new(InMemoryBackend::new());
    // Validation runs on decode; the write itself is unchecked
    cache
        .entities()
        .set(&Product {
            sku: "bad".to_string(),
            price: -1.0,
        })
        .await
        .expect("Failed to set");

    let result: Result<Option<Product>> = cache.entities().get_by_id("bad").await;
    assert!(matches!(result, Err(Error::ValidationError(_))));
}

#[tokio::test]
async fn test_entity_corrupt_bytes_surface_as_error() {
    let backend = InMemoryBackend::new();
    let cache = CacheService::new(backend.clone());
    backend
        .set("urn:user:x", b"garbage".to_vec(), None)
        .await
        .expect("Failed to write raw");

    let result: Result<Option<User>> = cache.entities().get_by_id("x").await;
    assert!(matches!(result, Err(Error::DeserializationError(_))));
}

#[tokio::test]
async fn test_publish_counts_subscribers() {
    let backend = InMemoryBackend::new();
    let cache = CacheService::new(backend.clone());

    let nobody = cache
        .entities()
        .publish("users", &user("1", "admin", 30))
        .await
        .expect("Failed to publish");
    assert_eq!(nobody, 0);

    let _first = backend.subscribe("users");
    let _second = backend.subscribe("users");
    let delivered = cache
        .entities()
        .publish("users", &user("1", "admin", 30))
        .await
        .expect("Failed to publish");
    assert_eq!(delivered, 2);
}

// ============================================================================
// Partial failures
// ============================================================================

/// Wraps the in-memory backend and fails every write to keys that start
/// with `urn:` while armed.
#[derive(Clone)]
struct FailingEntityWrites {
    inner: InMemoryBackend,
    armed: Arc<AtomicBool>,
}

impl FailingEntityWrites {
    fn new(inner: InMemoryBackend) -> Self {
        FailingEntityWrites {
            inner,
            armed: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl StoreBackend for FailingEntityWrites {
    async fn exists(&self, key: &str) -> Result<bool> {
        self.inner.exists(key).await
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        if self.armed.load(Ordering::SeqCst) && key.starts_with("urn:") {
            return Err(Error::BackendError(format!("injected failure for {}", key)));
        }
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(key).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        self.inner.expire(key, ttl).await
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>> {
        self.inner.hash_get_all(key).await
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<()> {
        self.inner.hash_set(key, field, value).await
    }

    async fn hash_delete(&self, key: &str, field: &str) -> Result<()> {
        self.inner.hash_delete(key, field).await
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<()> {
        self.inner.set_add(key, member).await
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<()> {
        self.inner.set_remove(key, member).await
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>> {
        self.inner.set_members(key).await
    }

    async fn publish(&self, channel: &str, message: &str) -> Result<u64> {
        self.inner.publish(channel, message).await
    }
}

#[tokio::test]
async fn test_failed_entity_write_keeps_index_entries() {
    let memory = InMemoryBackend::new();
    let backend = FailingEntityWrites::new(memory.clone());
    let cache = CacheService::new(backend.clone());

    let result = cache
        .entities()
        .set_indexed(&user("1", "admin", 30), &[by_role()])
        .await;
    assert!(matches!(result, Err(Error::BackendError(_))));

    // The index entry written before the failure is not rolled back
    let index = memory.hash_get_all("roles").await.expect("HGETALL failed");
    assert_eq!(index.get("1").map(String::as_str), Some("admin"));

    // ...and the dangling entry is skipped on read
    let admins: Vec<User> = cache
        .entities()
        .get_all_by_index("roles", "admin")
        .await
        .expect("Failed to query");
    assert!(admins.is_empty());

    backend.armed.store(false, Ordering::SeqCst);
    cache
        .entities()
        .set_indexed(&user("1", "admin", 30), &[by_role()])
        .await
        .expect("Retry should succeed");
    let admins: Vec<User> = cache
        .entities()
        .get_all_by_index("roles", "admin")
        .await
        .expect("Failed to query");
    assert_eq!(ids(admins), vec!["1"]);
}

// ============================================================================
// Write counts
// ============================================================================

#[derive(Default)]
struct WriteCounts {
    hash_sets: AtomicUsize,
    entity_sets: AtomicUsize,
    id_adds: AtomicUsize,
}

/// Wraps the in-memory backend and counts index and entity writes.
#[derive(Clone)]
struct CountingWrites {
    inner: InMemoryBackend,
    counts: Arc<WriteCounts>,
}

impl StoreBackend for CountingWrites {
    async fn exists(&self, key: &str) -> Result<bool> {
        self.inner.exists(key).await
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        if key.starts_with("urn:") {
            self.counts.entity_sets.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(key).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        self.inner.expire(key, ttl).await
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>> {
        self.inner.hash_get_all(key).await
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<()> {
        self.counts.hash_sets.fetch_add(1, Ordering::SeqCst);
        self.inner.hash_set(key, field, value).await
    }

    async fn hash_delete(&self, key: &str, field: &str) -> Result<()> {
        self.inner.hash_delete(key, field).await
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<()> {
        self.counts.id_adds.fetch_add(1, Ordering::SeqCst);
        self.inner.set_add(key, member).await
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<()> {
        self.inner.set_remove(key, member).await
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>> {
        self.inner.set_members(key).await
    }

    async fn publish(&self, channel: &str, message: &str) -> Result<u64> {
        self.inner.publish(channel, message).await
    }
}

#[tokio::test]
async fn test_bulk_indexed_set_stores_each_item_once() {
    let counts = Arc::new(WriteCounts::default());
    let backend = CountingWrites {
        inner: InMemoryBackend::new(),
        counts: counts.clone(),
    };
    let cache = CacheService::new(backend);

    let users: Vec<User> = (0..5)
        .map(|i| user(&i.to_string(), if i % 2 == 0 { "admin" } else { "user" }, 20 + i))
        .collect();
    cache
        .entities()
        .set_all_indexed(&users, &[by_role()])
        .await
        .expect("Failed to set_all_indexed");

    assert_eq!(counts.hash_sets.load(Ordering::SeqCst), 5);
    assert_eq!(counts.entity_sets.load(Ordering::SeqCst), 5);
    assert_eq!(counts.id_adds.load(Ordering::SeqCst), 5);

    let all: Vec<User> = cache.entities().get_all().await.expect("Failed to get_all");
    assert_eq!(all.len(), 5);
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test]
async fn test_concurrent_blob_writers() {
    let cache = CacheService::new(InMemoryBackend::new());

    let mut handles = vec![];
    for i in 0..10 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move {
            let key = format!("blob:{}", i);
            cache
                .blobs()
                .set(&key, vec![i as u8], &sliding(60))
                .await
                .expect("Failed to set");
            cache.blobs().refresh(&key).await.expect("Failed to refresh");
        }));
    }
    for handle in handles {
        handle.await.expect("Task failed");
    }

    for i in 0..10 {
        let value = cache
            .blobs()
            .get(&format!("blob:{}", i))
            .await
            .expect("Failed to get");
        assert_eq!(value, Some(vec![i as u8]));
    }
}
