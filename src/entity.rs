//! Entity trait for records kept in the [`EntityStore`](crate::EntityStore).

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Trait that all stored entities must implement.
///
/// The identity is exposed through an accessor instead of being looked up
/// by field name at runtime. Identities are case-insensitive: `"User-1"`,
/// `"user-1"` and `"USER-1"` address the same record.
///
/// # Example
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use redis_cache_kit::StoreEntity;
///
/// #[derive(Clone, Serialize, Deserialize)]
/// pub struct User {
///     pub id: u32,
///     pub name: String,
/// }
///
/// impl StoreEntity for User {
///     fn entity_id(&self) -> String {
///         self.id.to_string()
///     }
///
///     fn collection() -> &'static str {
///         "user"
///     }
/// }
/// ```
pub trait StoreEntity: Send + Sync + Serialize + for<'de> Deserialize<'de> + Clone {
    /// Return the entity's identity.
    fn entity_id(&self) -> String;

    /// Name of the collection holding every entity of this type.
    ///
    /// Final keys: `"urn:{collection}:{id}"` and `"ids:{collection}"`.
    fn collection() -> &'static str;

    /// Encode entity for storage.
    ///
    /// See `crate::serialization` for the envelope format.
    fn encode(&self) -> Result<Vec<u8>> {
        crate::serialization::encode_entity(self)
    }

    /// Decode entity from storage, validating the envelope.
    fn decode(bytes: &[u8]) -> Result<Self> {
        crate::serialization::decode_entity(bytes)
    }

    /// Optional: Validate entity after decoding.
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}
