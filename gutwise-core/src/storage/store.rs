//! JSON-encoding persistent store over a [`StorageMedium`].

use std::path::PathBuf;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{FileMedium, MemoryMedium, StorageError, StorageMedium};
use crate::keys::{self, StoreKey, CACHE_SUFFIX, DEFAULT_NAMESPACE};

/// Namespaced, best-effort key/value store.
///
/// Values are encoded as JSON text. Typed records carry their own schema
/// (timestamps are RFC 3339 strings), so decoding is driven by the target
/// type rather than by guessing at the text.
///
/// No operation returns an error: failures are logged and reported as
/// `false` (writes) or `None` (reads).
#[derive(Clone)]
pub struct PersistentStore {
    medium: Arc<dyn StorageMedium>,
    namespace: String,
}

impl PersistentStore {
    /// Creates a store over an existing medium.
    pub fn new(medium: Arc<dyn StorageMedium>, namespace: impl Into<String>) -> Self {
        Self {
            medium,
            namespace: namespace.into(),
        }
    }

    /// Creates a file-backed store rooted at `data_dir`.
    pub fn open(data_dir: PathBuf, namespace: impl Into<String>) -> Self {
        Self::new(Arc::new(FileMedium::new(data_dir)), namespace)
    }

    /// Creates an in-memory store using the default namespace.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryMedium::new()), DEFAULT_NAMESPACE)
    }

    /// Returns the key namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Prefixes `suffix` with this store's namespace.
    pub fn namespaced(&self, suffix: &str) -> String {
        keys::namespaced(&self.namespace, suffix)
    }

    /// Returns the full storage key for a well-known key.
    pub fn key(&self, key: StoreKey) -> String {
        self.namespaced(key.suffix())
    }

    /// Returns the reserved prefix under which cache entries live.
    pub fn cache_prefix(&self) -> String {
        self.namespaced(CACHE_SUFFIX)
    }

    /// Serializes `value` and stores it under `key`.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        match self.try_set(key, value) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Storage set failed for '{}': {}", key, e);
                false
            }
        }
    }

    /// Reads and deserializes the value under `key`.
    ///
    /// Returns `None` both when the key was never set and when the stored
    /// value cannot be read back as `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.try_get(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Storage get failed for '{}': {}", key, e);
                None
            }
        }
    }

    /// Removes `key`. Removing an absent key succeeds.
    pub fn remove(&self, key: &str) -> bool {
        match self.medium.remove_item(key) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Storage remove failed for '{}': {}", key, e);
                false
            }
        }
    }

    /// Removes every key in `known_keys`, leaving all other data in place.
    ///
    /// Attempts every key even after a failure; returns `false` if any
    /// removal failed.
    pub fn clear<S: AsRef<str>>(&self, known_keys: &[S]) -> bool {
        let mut ok = true;
        for key in known_keys {
            ok &= self.remove(key.as_ref());
        }
        ok
    }

    /// Returns the raw stored text for `key`, without decoding it.
    pub fn raw(&self, key: &str) -> Option<String> {
        match self.medium.get_item(key) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("Storage read failed for '{}': {}", key, e);
                None
            }
        }
    }

    /// Lists stored keys starting with `prefix`.
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        match self.medium.keys() {
            Ok(keys) => keys.into_iter().filter(|k| k.starts_with(prefix)).collect(),
            Err(e) => {
                tracing::error!("Storage key listing failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Fallible read used by components that must tell "absent" apart from
    /// "unreadable" before rewriting a value.
    pub(crate) fn try_get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.medium.get_item(key)? {
            Some(text) if !text.is_empty() => serde_json::from_str(&text)
                .map(Some)
                .map_err(|e| StorageError::Deserialize(key.to_string(), e)),
            _ => Ok(None),
        }
    }

    pub(crate) fn try_set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let text =
            serde_json::to_string(value).map_err(|e| StorageError::Serialize(key.to_string(), e))?;
        self.medium.set_item(key, &text)
    }
}

impl std::fmt::Debug for PersistentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentStore")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use serde::Deserialize;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Reading {
        label: String,
        taken_at: DateTime<Utc>,
        values: Vec<u32>,
        extra: Option<HashMap<String, bool>>,
    }

    fn sample_reading() -> Reading {
        Reading {
            label: "morning".to_string(),
            taken_at: Utc.with_ymd_and_hms(2025, 3, 14, 8, 30, 0).unwrap(),
            values: vec![1, 2, 3],
            extra: Some(HashMap::from([("fasted".to_string(), true)])),
        }
    }

    /// Medium whose every operation fails.
    struct BrokenMedium;

    impl StorageMedium for BrokenMedium {
        fn get_item(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("broken".to_string()))
        }
        fn set_item(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("broken".to_string()))
        }
        fn remove_item(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("broken".to_string()))
        }
        fn keys(&self) -> Result<Vec<String>, StorageError> {
            Err(StorageError::Unavailable("broken".to_string()))
        }
    }

    #[test]
    fn test_get_never_set_returns_none() {
        let store = PersistentStore::in_memory();
        assert_eq!(store.get::<Reading>("gutwise_nothing"), None);
    }

    #[test]
    fn test_structured_roundtrip_rehydrates_dates() {
        let store = PersistentStore::in_memory();
        let reading = sample_reading();

        assert!(store.set("gutwise_reading", &reading));
        let loaded: Reading = store.get("gutwise_reading").unwrap();

        assert_eq!(loaded, reading);
        assert!(store
            .raw("gutwise_reading")
            .unwrap()
            .contains("2025-03-14T08:30:00Z"));
    }

    #[test]
    fn test_file_store_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let store = PersistentStore::open(temp_dir.path().to_path_buf(), "gutwise");
        let reading = sample_reading();

        assert!(store.set("gutwise_reading", &reading));

        let reopened = PersistentStore::open(temp_dir.path().to_path_buf(), "gutwise");
        assert_eq!(reopened.get::<Reading>("gutwise_reading"), Some(reading));
    }

    #[test]
    fn test_get_wrong_shape_returns_none() {
        let store = PersistentStore::in_memory();
        assert!(store.set("k", &"just a string"));
        assert_eq!(store.get::<Reading>("k"), None);
    }

    #[test]
    fn test_remove() {
        let store = PersistentStore::in_memory();
        store.set("k", &1);
        assert!(store.remove("k"));
        assert_eq!(store.get::<i32>("k"), None);
        assert!(store.remove("k"));
    }

    #[test]
    fn test_clear_only_known_keys() {
        let store = PersistentStore::in_memory();
        store.set("gutwise_meals", &vec![1]);
        store.set("gutwise_symptoms", &vec![2]);
        store.set("other_app_data", &vec![3]);

        assert!(store.clear(&["gutwise_meals", "gutwise_symptoms"]));

        assert_eq!(store.get::<Vec<i32>>("gutwise_meals"), None);
        assert_eq!(store.get::<Vec<i32>>("gutwise_symptoms"), None);
        assert_eq!(store.get::<Vec<i32>>("other_app_data"), Some(vec![3]));
    }

    #[test]
    fn test_key_layout() {
        let store = PersistentStore::in_memory();
        assert_eq!(store.key(StoreKey::Meals), "gutwise_meals");
        assert_eq!(store.key(StoreKey::SyncQueue), "gutwise_sync_queue");
        assert_eq!(store.cache_prefix(), "gutwise_cache_");

        let custom = PersistentStore::new(Arc::new(MemoryMedium::new()), "tester");
        assert_eq!(custom.namespaced("meals"), "tester_meals");
        assert_eq!(custom.key(StoreKey::Onboarding), "tester_onboarding");
    }

    #[test]
    fn test_keys_with_prefix() {
        let store = PersistentStore::in_memory();
        store.set("gutwise_cache_a", &1);
        store.set("gutwise_cache_b", &2);
        store.set("gutwise_meals", &3);

        assert_eq!(
            store.keys_with_prefix("gutwise_cache_"),
            vec!["gutwise_cache_a", "gutwise_cache_b"]
        );
    }

    #[test]
    fn test_broken_medium_never_raises() {
        let store = PersistentStore::new(Arc::new(BrokenMedium), "gutwise");

        assert!(!store.set("k", &1));
        assert_eq!(store.get::<i32>("k"), None);
        assert!(!store.remove("k"));
        assert!(!store.clear(&["k"]));
        assert_eq!(store.raw("k"), None);
        assert!(store.keys_with_prefix("gutwise_").is_empty());
    }
}
