//! Store key layout.
//!
//! ```text
//! {key}-expiration       expiration record of a blob entry
//! urn:{collection}:{id}  one stored entity (id lower-cased)
//! ids:{collection}       set of every stored identity of a collection
//! {index}                secondary index hash: identity -> value
//! ```

use crate::entity::StoreEntity;

/// Suffix appended to a blob key to form its expiration record key.
pub const EXPIRATION_KEY_SUFFIX: &str = "-expiration";

/// Builder for store keys.
pub struct KeyBuilder;

impl KeyBuilder {
    /// Key of the expiration record that shadows `key`.
    pub fn expiration(key: &str) -> String {
        format!("{}{}", key, EXPIRATION_KEY_SUFFIX)
    }

    /// Normalize an entity identity for storage and lookup.
    pub fn normalize_id(id: &str) -> String {
        id.to_lowercase()
    }

    /// Key holding the entity with identity `id`.
    pub fn entity<T: StoreEntity>(id: &str) -> String {
        format!("urn:{}:{}", T::collection(), Self::normalize_id(id))
    }

    /// Key of the set tracking every identity stored for `T`.
    pub fn id_set<T: StoreEntity>() -> String {
        format!("ids:{}", T::collection())
    }
}
