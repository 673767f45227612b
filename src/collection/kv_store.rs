use anyhow::Result;
use std::collections::HashMap;
use std::sync::Mutex;

pub const OWNED_KEY: &str = "owned";
pub const DUPLICATES_KEY: &str = "duplicates";
pub const CUSTOM_IMAGES_KEY: &str = "customImages";
pub const MISSING_IMAGES_KEY: &str = "missingImages";

/// Durable string-keyed storage for JSON encoded values.
pub trait KeyValueStore: Send + Sync {
    /// Returns Ok(None) if the key was never written.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes all the given entries, either all of them are stored or none is.
    fn put_all(&self, entries: &[(&str, String)]) -> Result<()>;
}

/// Volatile store, for tests and throwaway sessions.
#[derive(Default)]
pub struct InMemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryKeyValueStore {
    pub fn with_entries<K: Into<String>, V: Into<String>>(
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        Self {
            entries: Mutex::new(
                entries
                    .into_iter()
                    .map(|(key, value)| (key.into(), value.into()))
                    .collect(),
            ),
        }
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn put_all(&self, entries: &[(&str, String)]) -> Result<()> {
        let mut locked = self.entries.lock().unwrap();
        for (key, value) in entries {
            locked.insert(key.to_string(), value.clone());
        }
        Ok(())
    }
}
