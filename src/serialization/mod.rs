//! Entity and message encodings.
//!
//! Entities are stored as Postcard inside a versioned envelope:
//!
//! ```text
//! ┌─────────────────┬─────────────────┬──────────────────────────┐
//! │  MAGIC (4 bytes)│VERSION (varint) │POSTCARD PAYLOAD (N bytes)│
//! └─────────────────┴─────────────────┴──────────────────────────┘
//!   "RCKE"              u32                postcard::to_allocvec(T)
//! ```
//!
//! Published messages are JSON text, so any subscriber can read them
//! without knowing the Rust type.
//!
//! Blob payloads are never touched by this module: the blob cache stores
//! exactly the bytes it is given.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Magic header for stored entities: b"RCKE"
pub const ENTITY_MAGIC: [u8; 4] = *b"RCKE";

/// Current schema version.
///
/// Increment when making breaking changes to stored entity types. Entities
/// written under another version fail to decode with
/// `Error::VersionMismatch`.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Versioned envelope around every stored entity.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EntityEnvelope<T> {
    pub magic: [u8; 4],
    pub version: u32,
    pub payload: T,
}

impl<T> EntityEnvelope<T> {
    /// Create a new envelope with current magic and version.
    pub fn new(payload: T) -> Self {
        Self {
            magic: ENTITY_MAGIC,
            version: CURRENT_SCHEMA_VERSION,
            payload,
        }
    }
}

/// Encode an entity for storage.
///
/// # Errors
///
/// Returns `Error::SerializationError` if Postcard serialization fails.
pub fn encode_entity<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let envelope = EntityEnvelope::new(value);
    postcard::to_allocvec(&envelope).map_err(|e| {
        log::error!("Entity serialization failed: {}", e);
        Error::SerializationError(e.to_string())
    })
}

/// Decode a stored entity, validating magic and schema version.
///
/// # Errors
///
/// - `Error::DeserializationError`: Bytes are not a Postcard envelope of `T`
/// - `Error::InvalidCacheEntry`: Invalid magic header
/// - `Error::VersionMismatch`: Schema version mismatch
pub fn decode_entity<'de, T: Deserialize<'de>>(bytes: &'de [u8]) -> Result<T> {
    let envelope: EntityEnvelope<T> = postcard::from_bytes(bytes).map_err(|e| {
        log::error!("Entity deserialization failed: {}", e);
        Error::DeserializationError(e.to_string())
    })?;

    if envelope.magic != ENTITY_MAGIC {
        log::warn!(
            "Invalid stored entity: expected magic {:?}, got {:?}",
            ENTITY_MAGIC,
            envelope.magic
        );
        return Err(Error::InvalidCacheEntry(format!(
            "Invalid magic: expected {:?}, got {:?}",
            ENTITY_MAGIC, envelope.magic
        )));
    }

    if envelope.version != CURRENT_SCHEMA_VERSION {
        log::warn!(
            "Entity version mismatch: expected {}, got {}",
            CURRENT_SCHEMA_VERSION,
            envelope.version
        );
        return Err(Error::VersionMismatch {
            expected: CURRENT_SCHEMA_VERSION,
            found: envelope.version,
        });
    }

    Ok(envelope.payload)
}

/// Encode a pub/sub message as canonical JSON text.
///
/// # Errors
///
/// Returns `Error::SerializationError` if the value cannot be represented as JSON.
pub fn encode_message<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::SerializationError(e.to_string()))
}
