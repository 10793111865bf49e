//! # redis-cache-kit
//!
//! A distributed caching façade over a Redis-style key-value store.
//!
//! ## Features
//!
//! - **Blob cache:** Opaque byte payloads with sliding or absolute expiration and
//!   explicit refresh (touch) semantics, see [`BlobCache`]
//! - **Entity store:** Typed records stored by identity, with case-insensitive
//!   lookup and secondary hash indexes for equality queries, see [`EntityStore`]
//! - **Pub/sub:** Publish any serializable item as JSON on a channel
//! - **Backend agnostic:** Redis (feature `redis`) or an in-memory keyspace
//!   for tests and local development
//!
//! ## Quick Start
//!
//! ```ignore
//! use redis_cache_kit::{CacheService, EntryOptions, IndexSpec, StoreEntity};
//! use redis_cache_kit::backend::InMemoryBackend;
//! use serde::{Deserialize, Serialize};
//! use std::time::Duration;
//!
//! #[derive(Clone, Serialize, Deserialize)]
//! struct User {
//!     id: String,
//!     role: String,
//! }
//!
//! impl StoreEntity for User {
//!     fn entity_id(&self) -> String { self.id.clone() }
//!     fn collection() -> &'static str { "user" }
//! }
//!
//! let cache = CacheService::new(InMemoryBackend::new());
//!
//! // Byte cache with a sliding window
//! let options = EntryOptions::default().with_sliding_expiration(Duration::from_secs(300));
//! cache.blobs().set("session:42", b"payload".to_vec(), &options).await?;
//! cache.blobs().refresh("session:42").await?;
//!
//! // Indexed entities
//! let user = User { id: "u1".into(), role: "admin".into() };
//! let by_role = IndexSpec::derived("roles", |u: &User| u.role.clone());
//! cache.entities().set_indexed(&user, &[by_role]).await?;
//! let admins: Vec<User> = cache.entities().get_all_by_index("roles", "ADMIN").await?;
//! ```

#[macro_use]
extern crate log;

pub mod backend;
pub mod blob;
pub mod config;
pub mod entity;
pub mod error;
pub mod expiration;
pub mod index;
pub mod key;
pub mod observability;
pub mod serialization;
pub mod service;
pub mod store;

// Re-exports for convenience
pub use backend::StoreBackend;
pub use blob::{BlobCache, RefreshableCache};
pub use config::CacheOptions;
pub use entity::StoreEntity;
pub use error::{Error, Result};
pub use expiration::EntryOptions;
pub use index::IndexSpec;
pub use service::CacheService;
pub use store::EntityStore;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
