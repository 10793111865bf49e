//! Typed entity store with secondary-index lookup.
//!
//! Entities of one type form a *collection*:
//!
//! ```text
//! urn:user:1     encoded entity (identity lower-cased)
//! urn:user:2
//! ids:user       {"1", "2"}
//! ```
//!
//! Secondary indexes are hashes mapping identity → lower-cased value (see
//! [`crate::index`]). An index query reads the whole hash and filters it in
//! memory, so its cost grows with the size of the index, not with the number
//! of matches. That scan is the scalability ceiling of index lookups: keep
//! indexes small relative to the collection, or use identity lookup.
//!
//! Multi-step writes (index entries then entity, entity then identity set)
//! are not transactional. A failure midway is returned to the caller and the
//! steps already written stay in place.

use crate::backend::StoreBackend;
use crate::entity::StoreEntity;
use crate::error::{Error, Result};
use crate::index::IndexSpec;
use crate::key::KeyBuilder;
use crate::serialization;
use serde::Serialize;
use std::collections::HashSet;

/// Entity store over a [`StoreBackend`].
///
/// All reads return fully materialized `Vec`s fetched in one pass.
pub struct EntityStore<B: StoreBackend> {
    backend: B,
}

impl<B: StoreBackend> EntityStore<B> {
    /// Create an entity store over `backend`.
    pub fn new(backend: B) -> Self {
        EntityStore { backend }
    }

    /// Get backend reference (for advanced use).
    pub fn backend(&self) -> &B {
        &self.backend
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Fetch the entity with identity `id` (case-insensitive).
    ///
    /// # Errors
    /// Returns `Err` on backend failure or if the stored bytes do not decode.
    pub async fn get_by_id<T: StoreEntity>(&self, id: &str) -> Result<Option<T>> {
        let key = KeyBuilder::entity::<T>(id);
        match self.backend.get(&key).await? {
            Some(bytes) => Ok(Some(Self::decode::<T>(&bytes)?)),
            None => {
                debug!("Entity {} not found", key);
                Ok(None)
            }
        }
    }

    /// Fetch the entities with the given identities.
    ///
    /// Missing identities are skipped; duplicates are fetched once.
    ///
    /// # Errors
    /// Returns `Err` on backend failure or if any stored entity does not decode.
    pub async fn get_by_ids<T: StoreEntity, S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<T>> {
        let mut seen = HashSet::new();
        let keys: Vec<String> = ids
            .iter()
            .map(|id| KeyBuilder::entity::<T>(id.as_ref()))
            .filter(|key| seen.insert(key.clone()))
            .collect();
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        let values = self.backend.mget(&key_refs).await?;

        values
            .into_iter()
            .flatten()
            .map(|bytes| Self::decode::<T>(&bytes))
            .collect()
    }

    /// Fetch every entity of type `T`.
    ///
    /// # Errors
    /// Returns `Err` on backend failure or if any stored entity does not decode.
    pub async fn get_all<T: StoreEntity>(&self) -> Result<Vec<T>> {
        let ids = self.backend.set_members(&KeyBuilder::id_set::<T>()).await?;
        debug!("» Loading {} {} entities", ids.len(), T::collection());
        self.get_by_ids(&ids).await
    }

    /// Fetch the entities whose `index` value equals `value`, ignoring case.
    ///
    /// Scans the whole index hash (O(index size)).
    ///
    /// # Errors
    /// Returns `Err` on backend failure, for an empty index name, or if any
    /// matched entity does not decode.
    pub async fn get_all_by_index<T: StoreEntity>(&self, index: &str, value: &str) -> Result<Vec<T>> {
        let ids = self.lookup_index(index, value).await?;
        self.get_by_ids(&ids).await
    }

    /// Like [`get_all_by_index`](Self::get_all_by_index), keeping only the
    /// entities for which `predicate` returns true.
    ///
    /// # Errors
    /// Same as `get_all_by_index`.
    pub async fn get_all_by_index_filtered<T, P>(
        &self,
        index: &str,
        value: &str,
        predicate: P,
    ) -> Result<Vec<T>>
    where
        T: StoreEntity,
        P: Fn(&T) -> bool,
    {
        let mut entities: Vec<T> = self.get_all_by_index(index, value).await?;
        entities.retain(|entity| predicate(entity));
        Ok(entities)
    }

    async fn lookup_index(&self, index: &str, value: &str) -> Result<Vec<String>> {
        if index.is_empty() {
            return Err(Error::InvalidArgument(
                "index name must not be empty".to_string(),
            ));
        }

        let wanted = value.to_lowercase();
        let entries = self.backend.hash_get_all(index).await?;
        let scanned = entries.len();

        let ids: Vec<String> = entries
            .into_iter()
            .filter(|(_, stored)| stored.to_lowercase() == wanted)
            .map(|(id, _)| id)
            .collect();

        debug!(
            "✓ Index {} scan: {} of {} entries match {:?}",
            index,
            ids.len(),
            scanned,
            value
        );
        Ok(ids)
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Store `item`, replacing any entity with the same identity.
    ///
    /// # Errors
    /// Returns `Err` on backend or serialization failure.
    pub async fn set<T: StoreEntity>(&self, item: &T) -> Result<()> {
        self.store(item).await
    }

    /// Write `item`'s entries into every index in `indexes`, then store it.
    ///
    /// # Errors
    /// Returns `Err` for an empty index name (before any write), or on the
    /// first failing write; earlier writes are not rolled back.
    pub async fn set_indexed<T: StoreEntity>(&self, item: &T, indexes: &[IndexSpec<T>]) -> Result<()> {
        Self::check_indexes(indexes)?;
        self.write_index_entries(item, indexes).await?;
        self.store(item).await
    }

    /// Store every item of `items`.
    ///
    /// # Errors
    /// Returns `Err` on the first failing write.
    pub async fn set_all<T: StoreEntity>(&self, items: &[T]) -> Result<()> {
        for item in items {
            self.store(item).await?;
        }
        debug!("✓ Stored {} {} entities", items.len(), T::collection());
        Ok(())
    }

    /// Write the index entries of every item, then store the batch once.
    ///
    /// # Errors
    /// Same as [`set_indexed`](Self::set_indexed).
    pub async fn set_all_indexed<T: StoreEntity>(
        &self,
        items: &[T],
        indexes: &[IndexSpec<T>],
    ) -> Result<()> {
        Self::check_indexes(indexes)?;
        for item in items {
            self.write_index_entries(item, indexes).await?;
        }
        self.set_all(items).await
    }

    /// Remove `item`'s entry from `index`.
    ///
    /// # Errors
    /// Returns `Err` on backend failure or for an empty index name.
    pub async fn remove_index_entry<T: StoreEntity>(&self, index: &str, item: &T) -> Result<()> {
        if index.is_empty() {
            return Err(Error::InvalidArgument(
                "index name must not be empty".to_string(),
            ));
        }
        let id = KeyBuilder::normalize_id(&item.entity_id());
        self.backend.hash_delete(index, &id).await
    }

    /// Delete exactly the entity with `item`'s identity.
    ///
    /// Index entries naming it are left in place.
    ///
    /// # Errors
    /// Returns `Err` on backend failure.
    pub async fn delete<T: StoreEntity>(&self, item: &T) -> Result<()> {
        let id = KeyBuilder::normalize_id(&item.entity_id());
        self.backend.delete(&KeyBuilder::entity::<T>(&id)).await?;
        self.backend
            .set_remove(&KeyBuilder::id_set::<T>(), &id)
            .await?;
        debug!("✓ Deleted {} {}", T::collection(), id);
        Ok(())
    }

    /// Delete every entity of type `T`.
    ///
    /// `sample` only selects the type; its identity is irrelevant.
    ///
    /// # Errors
    /// Returns `Err` on backend failure.
    pub async fn delete_all<T: StoreEntity>(&self, _sample: &T) -> Result<()> {
        self.clear::<T>().await
    }

    /// Delete every entity of type `T` without a sample instance.
    ///
    /// # Errors
    /// Returns `Err` on backend failure.
    pub async fn clear<T: StoreEntity>(&self) -> Result<()> {
        let id_set = KeyBuilder::id_set::<T>();
        let ids = self.backend.set_members(&id_set).await?;

        let mut keys: Vec<String> = ids.iter().map(|id| KeyBuilder::entity::<T>(id)).collect();
        keys.push(id_set);
        let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        self.backend.mdelete(&key_refs).await?;

        warn!("⚠ Cleared {} {} entities", ids.len(), T::collection());
        Ok(())
    }

    // ------------------------------------------------------------------
    // Pub/sub
    // ------------------------------------------------------------------

    /// Publish `item` as JSON on `channel`.
    ///
    /// Returns the number of subscribers that received it. Fire-and-forget:
    /// nothing is persisted and no acknowledgment is awaited.
    ///
    /// # Errors
    /// Returns `Err` on serialization or backend failure.
    pub async fn publish<M: Serialize + ?Sized>(&self, channel: &str, item: &M) -> Result<u64> {
        if channel.is_empty() {
            return Err(Error::InvalidArgument(
                "channel must not be empty".to_string(),
            ));
        }
        let message = serialization::encode_message(item)?;
        self.backend.publish(channel, &message).await
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn check_indexes<T>(indexes: &[IndexSpec<T>]) -> Result<()> {
        indexes.iter().try_for_each(IndexSpec::check)
    }

    async fn write_index_entries<T: StoreEntity>(&self, item: &T, indexes: &[IndexSpec<T>]) -> Result<()> {
        let id = KeyBuilder::normalize_id(&item.entity_id());
        for spec in indexes {
            self.backend
                .hash_set(spec.name(), &id, &spec.value_for(item))
                .await?;
        }
        Ok(())
    }

    async fn store<T: StoreEntity>(&self, item: &T) -> Result<()> {
        let id = KeyBuilder::normalize_id(&item.entity_id());
        if id.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "{} entity has an empty identity",
                T::collection()
            )));
        }

        let bytes = item.encode()?;
        self.backend
            .set(&KeyBuilder::entity::<T>(&id), bytes, None)
            .await?;
        self.backend.set_add(&KeyBuilder::id_set::<T>(), &id).await?;

        debug!("✓ Stored {} {}", T::collection(), id);
        Ok(())
    }

    fn decode<T: StoreEntity>(bytes: &[u8]) -> Result<T> {
        let entity = T::decode(bytes)?;
        entity.validate()?;
        Ok(entity)
    }
}
