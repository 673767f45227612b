//! Collection state and its portable snapshot.

use super::catalog::{default_image_path, is_in_catalog, ItemId, PLACEHOLDER_IMAGE_PATH};
use super::errors::CollectionError;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};

/// The image to display for an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    /// A user provided photo, as a data URI.
    Custom(String),
    /// The stock image failed to load at least once.
    Placeholder,
    /// The stock image, addressed by `img/<id>.jpg`.
    Default(ItemId),
}

impl ImageRef {
    pub fn src(&self) -> String {
        match self {
            ImageRef::Custom(payload) => payload.clone(),
            ImageRef::Placeholder => PLACEHOLDER_IMAGE_PATH.to_string(),
            ImageRef::Default(id) => default_image_path(*id),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ImageRef::Custom(_) => "custom",
            ImageRef::Placeholder => "placeholder",
            ImageRef::Default(_) => "default",
        }
    }
}

impl Serialize for ImageRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut image = serializer.serialize_struct("ImageRef", 2)?;
        image.serialize_field("kind", self.kind())?;
        image.serialize_field("src", &self.src())?;
        image.end()
    }
}

/// Portable serialization of the whole collection, used for export/import.
///
/// `owned` and `duplicates` are required, the image fields default to empty.
/// Map keys are written as strings by `serde_json`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub owned: Vec<ItemId>,
    pub duplicates: BTreeMap<ItemId, u32>,
    #[serde(default)]
    pub custom_images: BTreeMap<ItemId, String>,
    #[serde(default)]
    pub missing_images: Vec<ItemId>,
}

impl Snapshot {
    /// Parses and validates a snapshot file content.
    pub fn parse(contents: &str) -> Result<Snapshot, CollectionError> {
        let snapshot: Snapshot = serde_json::from_str(contents)
            .map_err(|err| CollectionError::InvalidSnapshot(err.to_string()))?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn to_json(&self) -> Result<String, CollectionError> {
        serde_json::to_string(self).map_err(|err| CollectionError::Storage(err.into()))
    }

    fn validate(&self) -> Result<(), CollectionError> {
        let out_of_catalog = self
            .owned
            .iter()
            .chain(self.duplicates.keys())
            .chain(self.custom_images.keys())
            .chain(self.missing_images.iter())
            .find(|id| !is_in_catalog(**id));
        if let Some(id) = out_of_catalog {
            return Err(CollectionError::InvalidSnapshot(format!(
                "item {} is not part of the album",
                id
            )));
        }
        if let Some((id, _)) = self.duplicates.iter().find(|(_, count)| **count == 0) {
            return Err(CollectionError::InvalidSnapshot(format!(
                "item {} has a duplicate count of 0",
                id
            )));
        }
        Ok(())
    }
}

/// Everything the state holds about a single item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRecord {
    id: ItemId,
    owned: bool,
    duplicates: u32,
    custom_image: Option<String>,
    image_missing: bool,
}

/// The authoritative collection state. Item ids are expected to be already
/// checked against the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionState {
    owned: BTreeSet<ItemId>,
    // Extra copies beyond the first one, values are always >= 1.
    duplicates: BTreeMap<ItemId, u32>,
    custom_images: BTreeMap<ItemId, String>,
    missing_images: BTreeSet<ItemId>,
}

impl CollectionState {
    pub fn from_parts(
        owned: BTreeSet<ItemId>,
        duplicates: BTreeMap<ItemId, u32>,
        custom_images: BTreeMap<ItemId, String>,
        missing_images: BTreeSet<ItemId>,
    ) -> Self {
        let duplicates = duplicates
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .collect();
        Self {
            owned,
            duplicates,
            custom_images,
            missing_images,
        }
    }

    /// Canonical ownership predicate: having duplicates implies owning the item.
    pub fn is_owned(&self, id: ItemId) -> bool {
        self.owned.contains(&id) || self.duplicate_count(id) > 0
    }

    pub fn duplicate_count(&self, id: ItemId) -> u32 {
        self.duplicates.get(&id).copied().unwrap_or(0)
    }

    pub fn owned_set(&self) -> &BTreeSet<ItemId> {
        &self.owned
    }

    pub fn duplicates(&self) -> &BTreeMap<ItemId, u32> {
        &self.duplicates
    }

    pub fn custom_images(&self) -> &BTreeMap<ItemId, String> {
        &self.custom_images
    }

    pub fn missing_images(&self) -> &BTreeSet<ItemId> {
        &self.missing_images
    }

    pub fn is_image_missing(&self, id: ItemId) -> bool {
        self.missing_images.contains(&id)
    }

    /// Flips the plain ownership of an item, leaving duplicates untouched.
    /// Returns whether the item is in the ownership set afterwards.
    pub fn toggle_owned(&mut self, id: ItemId) -> bool {
        if self.owned.remove(&id) {
            false
        } else {
            self.owned.insert(id);
            true
        }
    }

    /// Returns the new duplicate count.
    pub fn increment_duplicate(&mut self, id: ItemId) -> u32 {
        let count = self.duplicates.entry(id).or_insert(0);
        *count += 1;
        self.owned.insert(id);
        *count
    }

    /// Returns false when there was nothing to decrement. Never touches ownership.
    pub fn decrement_duplicate(&mut self, id: ItemId) -> bool {
        match self.duplicate_count(id) {
            0 => false,
            1 => {
                self.duplicates.remove(&id);
                true
            }
            count => {
                self.duplicates.insert(id, count - 1);
                true
            }
        }
    }

    pub fn resolve_image(&self, id: ItemId) -> ImageRef {
        if let Some(payload) = self.custom_images.get(&id) {
            ImageRef::Custom(payload.clone())
        } else if self.missing_images.contains(&id) {
            ImageRef::Placeholder
        } else {
            ImageRef::Default(id)
        }
    }

    /// Returns false if the item was already flagged.
    pub fn mark_image_missing(&mut self, id: ItemId) -> bool {
        self.missing_images.insert(id)
    }

    /// Only items whose stock image is flagged missing accept a custom photo.
    pub fn attach_custom_image(
        &mut self,
        id: ItemId,
        payload: String,
    ) -> Result<(), CollectionError> {
        if !self.missing_images.remove(&id) {
            return Err(CollectionError::PhotoNotAllowed(id));
        }
        self.custom_images.insert(id, payload);
        Ok(())
    }

    pub fn item_record(&self, id: ItemId) -> ItemRecord {
        ItemRecord {
            id,
            owned: self.owned.contains(&id),
            duplicates: self.duplicate_count(id),
            custom_image: self.custom_images.get(&id).cloned(),
            image_missing: self.missing_images.contains(&id),
        }
    }

    /// Puts an item back exactly as `record` captured it.
    pub fn restore_item(&mut self, record: ItemRecord) {
        let id = record.id;
        if record.owned {
            self.owned.insert(id);
        } else {
            self.owned.remove(&id);
        }
        if record.duplicates > 0 {
            self.duplicates.insert(id, record.duplicates);
        } else {
            self.duplicates.remove(&id);
        }
        match record.custom_image {
            Some(payload) => self.custom_images.insert(id, payload),
            None => self.custom_images.remove(&id),
        };
        if record.image_missing {
            self.missing_images.insert(id);
        } else {
            self.missing_images.remove(&id);
        }
    }

    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            owned: self.owned.iter().copied().collect(),
            duplicates: self.duplicates.clone(),
            custom_images: self.custom_images.clone(),
            missing_images: self.missing_images.iter().copied().collect(),
        }
    }
}

impl TryFrom<Snapshot> for CollectionState {
    type Error = CollectionError;

    fn try_from(snapshot: Snapshot) -> Result<Self, Self::Error> {
        snapshot.validate()?;
        Ok(Self {
            owned: snapshot.owned.into_iter().collect(),
            duplicates: snapshot.duplicates,
            custom_images: snapshot.custom_images,
            missing_images: snapshot.missing_images.into_iter().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::catalog::catalog_ids;
    use crate::collection::projection::counters;

    #[test]
    fn duplicates_imply_ownership() {
        let mut state = CollectionState::default();
        state.increment_duplicate(7);
        // Un-owning the base copy keeps the item owned through its duplicate.
        assert!(!state.toggle_owned(7));
        assert!(state.is_owned(7));
        assert!(!state.owned_set().contains(&7));

        for id in catalog_ids() {
            assert_eq!(
                state.is_owned(id),
                state.owned_set().contains(&id) || state.duplicate_count(id) > 0
            );
        }
    }

    #[test]
    fn increments_twice() {
        let mut state = CollectionState::default();
        assert_eq!(state.increment_duplicate(5), 1);
        assert_eq!(state.increment_duplicate(5), 2);
        assert_eq!(state.duplicate_count(5), 2);
        assert!(state.is_owned(5));
        assert_eq!(counters(&state).duplicate_count, 2);
    }

    #[test]
    fn restoring_a_record_undoes_item_changes() {
        let mut state = CollectionState::default();
        state.increment_duplicate(4);
        state.mark_image_missing(4);
        state.mark_image_missing(6);
        let before = state.clone();

        let record = state.item_record(4);
        state.toggle_owned(4);
        state.increment_duplicate(4);
        state
            .attach_custom_image(4, "data:,x".to_string())
            .unwrap();
        assert_ne!(state, before);
        state.restore_item(record);
        assert_eq!(state, before);

        let record = state.item_record(6);
        state
            .attach_custom_image(6, "data:,y".to_string())
            .unwrap();
        state.restore_item(record);
        assert_eq!(state, before);
    }

    #[test]
    fn decrement_from_one_removes_the_key() {
        let mut state = CollectionState::default();
        state.increment_duplicate(5);
        assert!(state.decrement_duplicate(5));
        assert!(!state.duplicates().contains_key(&5));
        assert!(!state.decrement_duplicate(5));
        assert!(!state.decrement_duplicate(6));
    }

    #[test]
    fn increment_then_decrement_keeps_ownership() {
        let mut state = CollectionState::default();
        state.increment_duplicate(9);
        state.increment_duplicate(9);
        let before = state.clone();

        state.increment_duplicate(9);
        state.decrement_duplicate(9);
        assert_eq!(state, before);

        let mut fresh = CollectionState::default();
        fresh.increment_duplicate(3);
        fresh.decrement_duplicate(3);
        assert_eq!(fresh.duplicate_count(3), 0);
        assert!(fresh.owned_set().contains(&3));
    }

    #[test]
    fn resolves_images_by_priority() {
        let mut state = CollectionState::default();
        assert_eq!(state.resolve_image(1), ImageRef::Default(1));
        assert_eq!(state.resolve_image(1).src(), "img/1.jpg");

        assert!(state.mark_image_missing(1));
        assert!(!state.mark_image_missing(1));
        assert_eq!(state.resolve_image(1), ImageRef::Placeholder);
        assert_eq!(state.resolve_image(1).src(), "img/placeholder.jpg");

        state
            .attach_custom_image(1, "data:image/png;base64,AAAA".to_string())
            .unwrap();
        assert!(!state.is_image_missing(1));
        assert_eq!(
            state.resolve_image(1),
            ImageRef::Custom("data:image/png;base64,AAAA".to_string())
        );
    }

    #[test]
    fn photo_requires_missing_marker() {
        let mut state = CollectionState::default();
        let result = state.attach_custom_image(2, "data:,x".to_string());
        assert!(matches!(result, Err(CollectionError::PhotoNotAllowed(2))));
        assert!(state.custom_images().is_empty());
    }

    #[test]
    fn serializes_image_ref() {
        let json = serde_json::to_value(ImageRef::Default(3)).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "default", "src": "img/3.jpg"}));
    }

    #[test]
    fn snapshot_uses_string_keys() {
        let mut state = CollectionState::default();
        state.toggle_owned(1);
        state.increment_duplicate(5);
        state.mark_image_missing(12);

        let json = state.to_snapshot().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["owned"], serde_json::json!([1, 5]));
        assert_eq!(value["duplicates"], serde_json::json!({"5": 1}));
        assert_eq!(value["customImages"], serde_json::json!({}));
        assert_eq!(value["missingImages"], serde_json::json!([12]));
    }

    #[test]
    fn snapshot_optional_fields_default_to_empty() {
        let snapshot = Snapshot::parse(r#"{"owned": [3, 4], "duplicates": {"4": 2}}"#).unwrap();
        assert_eq!(snapshot.owned, vec![3, 4]);
        assert_eq!(snapshot.duplicates.get(&4), Some(&2));
        assert!(snapshot.custom_images.is_empty());
        assert!(snapshot.missing_images.is_empty());
    }

    #[test]
    fn rejects_malformed_snapshots() {
        let invalid = [
            "not json",
            r#"{"duplicates": {}}"#,
            r#"{"owned": []}"#,
            r#"{"owned": [0], "duplicates": {}}"#,
            r#"{"owned": [], "duplicates": {"469": 1}}"#,
            r#"{"owned": [], "duplicates": {"3": 0}}"#,
            r#"{"owned": [], "duplicates": {"3": -1}}"#,
            r#"{"owned": [], "duplicates": {}, "missingImages": [1000]}"#,
        ];
        for contents in invalid {
            assert!(
                matches!(
                    Snapshot::parse(contents),
                    Err(CollectionError::InvalidSnapshot(_))
                ),
                "accepted {}",
                contents
            );
        }
    }

    #[test]
    fn snapshot_round_trip_preserves_state() {
        let mut state = CollectionState::default();
        state.toggle_owned(10);
        state.increment_duplicate(20);
        state.mark_image_missing(30);
        state.mark_image_missing(31);
        state
            .attach_custom_image(31, "data:image/jpeg;base64,/9j/".to_string())
            .unwrap();

        let restored = CollectionState::try_from(state.to_snapshot()).unwrap();
        assert_eq!(restored, state);
    }
}
