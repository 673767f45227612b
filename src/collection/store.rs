use super::catalog::{is_in_catalog, ItemId};
use super::errors::CollectionError;
use super::kv_store::{
    KeyValueStore, CUSTOM_IMAGES_KEY, DUPLICATES_KEY, MISSING_IMAGES_KEY, OWNED_KEY,
};
use super::models::{CollectionState, ImageRef, Snapshot};
use anyhow::Context;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Single source of truth for the collection, mirrored to a [`KeyValueStore`]
/// after every change.
pub struct CollectionStore {
    state: CollectionState,
    kv_store: Arc<dyn KeyValueStore>,
}

fn load_entry<T: DeserializeOwned + Default>(
    kv_store: &dyn KeyValueStore,
    key: &str,
    ids_of: impl Fn(&T) -> Vec<ItemId>,
) -> T {
    let raw = match kv_store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return T::default(),
        Err(err) => {
            warn!("Could not read stored {}, starting empty: {:#}", key, err);
            return T::default();
        }
    };
    let value: T = match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(err) => {
            warn!("Stored {} is malformed, starting empty: {}", key, err);
            return T::default();
        }
    };
    if let Some(id) = ids_of(&value).into_iter().find(|id| !is_in_catalog(*id)) {
        warn!(
            "Stored {} references item {} outside the album, starting empty",
            key, id
        );
        return T::default();
    }
    value
}

impl CollectionStore {
    /// Loads the persisted collection. Missing or malformed entries fall back
    /// to empty values, loading never fails.
    pub fn load(kv_store: Arc<dyn KeyValueStore>) -> Self {
        let owned: BTreeSet<ItemId> = load_entry(kv_store.as_ref(), OWNED_KEY, |ids: &BTreeSet<ItemId>| {
            ids.iter().copied().collect()
        });
        let duplicates: BTreeMap<ItemId, u32> =
            load_entry(kv_store.as_ref(), DUPLICATES_KEY, |map: &BTreeMap<ItemId, u32>| {
                map.keys().copied().collect()
            });
        let custom_images: BTreeMap<ItemId, String> =
            load_entry(kv_store.as_ref(), CUSTOM_IMAGES_KEY, |map: &BTreeMap<ItemId, String>| {
                map.keys().copied().collect()
            });
        let missing_images: BTreeSet<ItemId> =
            load_entry(kv_store.as_ref(), MISSING_IMAGES_KEY, |ids: &BTreeSet<ItemId>| {
                ids.iter().copied().collect()
            });

        let state = CollectionState::from_parts(owned, duplicates, custom_images, missing_images);
        info!(
            "Loaded collection: {} owned, {} with duplicates, {} custom images, {} missing images",
            state.owned_set().len(),
            state.duplicates().len(),
            state.custom_images().len(),
            state.missing_images().len()
        );
        Self { state, kv_store }
    }

    pub fn state(&self) -> &CollectionState {
        &self.state
    }

    pub fn is_owned(&self, id: ItemId) -> bool {
        self.state.is_owned(id)
    }

    pub fn toggle_owned(&mut self, id: ItemId) -> Result<bool, CollectionError> {
        check_item(id)?;
        let owned = self.apply(id, |state| Ok((state.toggle_owned(id), true)))?;
        debug!("Item {} owned: {}", id, owned);
        Ok(owned)
    }

    pub fn increment_duplicate(&mut self, id: ItemId) -> Result<u32, CollectionError> {
        check_item(id)?;
        let count = self.apply(id, |state| Ok((state.increment_duplicate(id), true)))?;
        debug!("Item {} duplicates: {}", id, count);
        Ok(count)
    }

    /// Returns false, without touching storage, when the item has no duplicates.
    pub fn decrement_duplicate(&mut self, id: ItemId) -> Result<bool, CollectionError> {
        check_item(id)?;
        let changed = self.apply(id, |state| {
            let changed = state.decrement_duplicate(id);
            Ok((changed, changed))
        })?;
        if changed {
            debug!(
                "Item {} duplicates: {}",
                id,
                self.state.duplicate_count(id)
            );
        }
        Ok(changed)
    }

    pub fn resolve_image(&self, id: ItemId) -> Result<ImageRef, CollectionError> {
        check_item(id)?;
        Ok(self.state.resolve_image(id))
    }

    pub fn mark_image_missing(&mut self, id: ItemId) -> Result<bool, CollectionError> {
        check_item(id)?;
        let changed = self.apply(id, |state| {
            let changed = state.mark_image_missing(id);
            Ok((changed, changed))
        })?;
        if changed {
            debug!("Item {} flagged with a missing image", id);
        }
        Ok(changed)
    }

    pub fn attach_custom_image(
        &mut self,
        id: ItemId,
        payload: String,
    ) -> Result<(), CollectionError> {
        check_item(id)?;
        self.apply(id, |state| state.attach_custom_image(id, payload).map(|_| ((), true)))?;
        debug!("Item {} got a custom image", id);
        Ok(())
    }

    pub fn export_snapshot(&self) -> Snapshot {
        self.state.to_snapshot()
    }

    /// Replaces the whole collection with the snapshot content. An invalid
    /// snapshot leaves the collection untouched.
    pub fn import_snapshot(&mut self, snapshot: Snapshot) -> Result<(), CollectionError> {
        let imported = CollectionState::try_from(snapshot)?;
        let previous = std::mem::replace(&mut self.state, imported);
        if let Err(err) = self.persist() {
            self.state = previous;
            return Err(err);
        }
        info!(
            "Imported collection: {} owned, {} with duplicates",
            self.state.owned_set().len(),
            self.state.duplicates().len()
        );
        Ok(())
    }

    /// Runs `mutation` on the state in place and persists it when the
    /// mutation reports a change. On failure item `id` is put back as it was.
    fn apply<T>(
        &mut self,
        id: ItemId,
        mutation: impl FnOnce(&mut CollectionState) -> Result<(T, bool), CollectionError>,
    ) -> Result<T, CollectionError> {
        let record = self.state.item_record(id);
        let result = mutation(&mut self.state).and_then(|(result, changed)| {
            if changed {
                self.persist()?;
            }
            Ok(result)
        });
        if result.is_err() {
            self.state.restore_item(record);
        }
        result
    }

    fn persist(&self) -> Result<(), CollectionError> {
        let entries = encode_entries(&self.state).context("Failed to encode collection")?;
        self.kv_store.put_all(&entries).map_err(|err| {
            error!("Failed to persist collection: {:#}", err);
            CollectionError::Storage(err)
        })
    }
}

fn check_item(id: ItemId) -> Result<(), CollectionError> {
    if is_in_catalog(id) {
        Ok(())
    } else {
        Err(CollectionError::UnknownItem(id))
    }
}

fn encode_entries(state: &CollectionState) -> serde_json::Result<Vec<(&'static str, String)>> {
    Ok(vec![
        (OWNED_KEY, serde_json::to_string(state.owned_set())?),
        (DUPLICATES_KEY, serde_json::to_string(state.duplicates())?),
        (CUSTOM_IMAGES_KEY, serde_json::to_string(state.custom_images())?),
        (MISSING_IMAGES_KEY, serde_json::to_string(state.missing_images())?),
    ])
}
