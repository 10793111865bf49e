//! Basic usage of the blob cache and the indexed entity store.
//!
//! Runs against the in-memory backend. Build with `--features redis` and set
//! `REDIS_URL` to run the same flow against a live server.

use redis_cache_kit::backend::{InMemoryBackend, StoreBackend};
use redis_cache_kit::{
    error::Result, CacheService, EntryOptions, IndexSpec, RefreshableCache, StoreEntity,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Example entity: a user account
#[derive(Clone, Serialize, Deserialize, Debug)]
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

fn sample_users() -> Vec<User> {
    vec![
        User {
            id: "1".to_string(),
            name: "Ada".to_string(),
            role: "Admin".to_string(),
            age: 36,
        },
        User {
            id: "2".to_string(),
            name: "Brian".to_string(),
            role: "User".to_string(),
            age: 41,
        },
        User {
            id: "3".to_string(),
            name: "Chen".to_string(),
            role: "admin".to_string(),
            age: 28,
        },
    ]
}

async fn run<B: StoreBackend>(cache: CacheService<B>) -> Result<()> {
    // 1. Blob cache with a sliding window
    println!("1. Caching a session blob with a 20 minute sliding window...");
    let options = EntryOptions::default().with_sliding_expiration(Duration::from_secs(20 * 60));
    cache
        .blobs()
        .set("session:42", b"{\"cart\":[17,23]}".to_vec(), &options)
        .await?;

    if let Some(bytes) = cache.blobs().get("session:42").await? {
        println!("   ✓ Session loaded ({} bytes)", bytes.len());
    }
    cache.blobs().refresh("session:42").await?;
    println!("   ✓ Window re-armed\n");

    // 2. Entities with a role index
    println!("2. Storing users indexed by role...");
    let by_role = IndexSpec::derived("roles", |u: &User| u.role.clone());
    cache
        .entities()
        .set_all_indexed(&sample_users(), &[by_role])
        .await?;

    let admins: Vec<User> = cache.entities().get_all_by_index("roles", "ADMIN").await?;
    println!("   ✓ {} admins", admins.len());

    let senior: Vec<User> = cache
        .entities()
        .get_all_by_index_filtered("roles", "admin", |u: &User| u.age > 30)
        .await?;
    for user in &senior {
        println!("   ✓ Senior admin: {} ({})", user.name, user.age);
    }

    // 3. Identity lookup is case-insensitive
    if let Some(user) = cache.entities().get_by_id::<User>("1").await? {
        println!("\n3. Loaded user {} by identity", user.name);
    }

    // 4. Notify listeners
    let receivers = cache.entities().publish("users", &senior).await?;
    println!("4. Published senior admins to {} subscribers", receivers);

    // 5. Cleanup
    cache.blobs().remove("session:42").await?;
    cache.entities().clear::<User>().await?;
    println!("5. Cleaned up\n");

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Debug)
        .try_init()
        .ok();

    println!("\n=== Redis Cache Kit - Basic Example ===\n");

    #[cfg(feature = "redis")]
    if let Ok(url) = std::env::var("REDIS_URL") {
        let backend = redis_cache_kit::backend::RedisBackend::from_connection_string(&url)?;
        return run(CacheService::new(backend)).await;
    }

    run(CacheService::new(InMemoryBackend::new())).await
}
