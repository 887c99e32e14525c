//! TTL-based read-through cache on top of [`PersistentStore`].
//!
//! Entries are stored under `<namespace>_cache_<key>` as
//! `{ data, storedAt, ttl }`. Expiry is lazy: an entry is checked only when
//! it is read, and an expired entry is removed by that read.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::storage::{PersistentStore, StorageError};

/// TTL applied when the caller doesn't pick one.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// A cached value with the time it was stored and how long it stays valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    pub data: T,
    pub stored_at: DateTime<Utc>,
    #[serde(with = "ttl_millis")]
    pub ttl: Duration,
}

impl<T> CacheEntry<T> {
    /// An entry is valid while `now - stored_at < ttl`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        // A stored_at in the future (clock moved backwards) counts as zero elapsed.
        let elapsed = (now - self.stored_at).to_std().unwrap_or(Duration::ZERO);
        elapsed < self.ttl
    }
}

/// TTL cache for remote reads.
#[derive(Debug, Clone)]
pub struct CacheManager {
    store: PersistentStore,
    clock: Arc<dyn Clock>,
    default_ttl: Duration,
}

impl CacheManager {
    pub fn new(store: PersistentStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            default_ttl: DEFAULT_TTL,
        }
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Returns the storage key backing the cache key `key`.
    pub fn storage_key(&self, key: &str) -> String {
        format!("{}{}", self.store.cache_prefix(), key)
    }

    /// Caches `data` under `key` with the default TTL.
    pub fn set<T: Serialize>(&self, key: &str, data: &T) -> bool {
        self.set_with_ttl(key, data, self.default_ttl)
    }

    /// Caches `data` under `key`, valid for `ttl` from now.
    pub fn set_with_ttl<T: Serialize>(&self, key: &str, data: &T, ttl: Duration) -> bool {
        let entry = CacheEntry {
            data,
            stored_at: self.clock.now(),
            ttl,
        };
        self.store.set(&self.storage_key(key), &entry)
    }

    /// Returns the cached value, or `None` if absent or expired.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_entry(key).map(|entry| entry.data)
    }

    /// Returns the whole cache entry, or `None` if absent or expired.
    ///
    /// An expired or undecodable entry is removed from storage before
    /// returning.
    pub fn get_entry<T: DeserializeOwned>(&self, key: &str) -> Option<CacheEntry<T>> {
        let storage_key = self.storage_key(key);
        let entry: CacheEntry<T> = match self.store.try_get(&storage_key) {
            Ok(entry) => entry?,
            Err(StorageError::Deserialize(_, e)) => {
                tracing::debug!("Cache entry '{}' unreadable, evicting: {}", key, e);
                self.store.remove(&storage_key);
                return None;
            }
            Err(e) => {
                tracing::error!("Cache read failed for '{}': {}", key, e);
                return None;
            }
        };

        if entry.is_valid_at(self.clock.now()) {
            Some(entry)
        } else {
            tracing::debug!("Cache entry '{}' expired", key);
            self.store.remove(&storage_key);
            None
        }
    }

    pub fn remove(&self, key: &str) -> bool {
        self.store.remove(&self.storage_key(key))
    }

    /// Removes every cache entry. Data outside the cache prefix is untouched.
    pub fn clear(&self) -> bool {
        let keys = self.store.keys_with_prefix(&self.store.cache_prefix());
        self.store.clear(&keys)
    }

    /// Returns the cached value for `key`, or fetches, caches and returns a
    /// fresh one.
    ///
    /// A failed fetch is logged and yields `None`.
    pub async fn get_or_fetch<T, F, Fut, E>(&self, key: &str, ttl: Duration, fetch: F) -> Option<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        if let Some(data) = self.get(key) {
            return Some(data);
        }

        match fetch().await {
            Ok(data) => {
                self.set_with_ttl(key, &data, ttl);
                Some(data)
            }
            Err(e) => {
                tracing::warn!("Fetch for cache key '{}' failed: {}", key, e);
                None
            }
        }
    }
}

/// Serializes a [`Duration`] as integer milliseconds.
mod ttl_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ttl: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;
    use serde_json::json;

    fn test_cache() -> (CacheManager, PersistentStore, Arc<ManualClock>) {
        let store = PersistentStore::in_memory();
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap(),
        ));
        let cache = CacheManager::new(store.clone(), clock.clone());
        (cache, store, clock)
    }

    #[test]
    fn test_get_after_set_returns_data() {
        let (cache, _store, _clock) = test_cache();
        let data = json!({ "patterns": [{ "id": "p1", "confidence": 0.8 }] });

        assert!(cache.set("patterns", &data));
        assert_eq!(cache.get::<serde_json::Value>("patterns"), Some(data));
    }

    #[test]
    fn test_get_missing_returns_none() {
        let (cache, _store, _clock) = test_cache();
        assert_eq!(cache.get::<String>("nothing"), None);
    }

    #[test]
    fn test_valid_until_ttl() {
        let (cache, _store, clock) = test_cache();
        cache.set_with_ttl("k", &"v", Duration::from_secs(60));

        clock.advance(chrono::Duration::seconds(59));
        assert_eq!(cache.get::<String>("k"), Some("v".to_string()));
    }

    #[test]
    fn test_expired_entry_is_removed() {
        let (cache, store, clock) = test_cache();
        cache.set_with_ttl("k", &"v", Duration::from_secs(60));
        assert!(store.raw("gutwise_cache_k").is_some());

        clock.advance(chrono::Duration::seconds(60));
        assert_eq!(cache.get::<String>("k"), None);
        assert!(store.raw("gutwise_cache_k").is_none());
    }

    #[test]
    fn test_undecodable_entry_is_removed() {
        let (cache, store, _clock) = test_cache();
        cache.set("k", &"not a number");

        assert_eq!(cache.get::<u32>("k"), None);
        assert!(store.raw("gutwise_cache_k").is_none());
    }

    #[test]
    fn test_expired_entry_persists_until_read() {
        let (cache, store, clock) = test_cache();
        cache.set_with_ttl("k", &"v", Duration::from_secs(1));

        clock.advance(chrono::Duration::minutes(10));
        assert!(store.raw("gutwise_cache_k").is_some());
    }

    #[test]
    fn test_default_ttl_is_five_minutes() {
        let (cache, _store, clock) = test_cache();
        cache.set("k", &1);

        clock.advance(chrono::Duration::seconds(299));
        assert_eq!(cache.get::<i32>("k"), Some(1));

        clock.advance(chrono::Duration::seconds(1));
        assert_eq!(cache.get::<i32>("k"), None);
    }

    #[test]
    fn test_persisted_layout() {
        let (cache, store, _clock) = test_cache();
        cache.set_with_ttl("k", &42, Duration::from_secs(2));

        let raw: serde_json::Value =
            serde_json::from_str(&store.raw("gutwise_cache_k").unwrap()).unwrap();
        assert_eq!(raw["data"], 42);
        assert_eq!(raw["ttl"], 2000);
        assert_eq!(raw["storedAt"], "2025-01-01T09:00:00Z");
    }

    #[test]
    fn test_get_entry_exposes_stored_at() {
        let (cache, _store, clock) = test_cache();
        cache.set("k", &"v");

        let entry = cache.get_entry::<String>("k").unwrap();
        assert_eq!(entry.stored_at, clock.now());
        assert_eq!(entry.ttl, DEFAULT_TTL);
    }

    #[test]
    fn test_clear_leaves_other_data() {
        let (cache, store, _clock) = test_cache();
        cache.set("a", &1);
        cache.set("b", &2);
        store.set("gutwise_meals", &vec!["m1"]);

        assert!(cache.clear());

        assert_eq!(cache.get::<i32>("a"), None);
        assert_eq!(cache.get::<i32>("b"), None);
        assert_eq!(store.get::<Vec<String>>("gutwise_meals"), Some(vec!["m1".to_string()]));
    }

    #[test]
    fn test_remove() {
        let (cache, _store, _clock) = test_cache();
        cache.set("k", &1);
        assert!(cache.remove("k"));
        assert_eq!(cache.get::<i32>("k"), None);
    }

    #[test]
    fn test_clock_moving_backwards_keeps_entry_valid() {
        let (cache, _store, clock) = test_cache();
        cache.set_with_ttl("k", &1, Duration::from_secs(10));

        clock.advance(chrono::Duration::hours(-1));
        assert_eq!(cache.get::<i32>("k"), Some(1));
    }

    #[tokio::test]
    async fn test_get_or_fetch_uses_cache_then_network() {
        let (cache, _store, clock) = test_cache();
        let mut calls = 0;

        let first = cache
            .get_or_fetch("k", Duration::from_secs(30), || {
                calls += 1;
                async { Ok::<_, String>(vec![1, 2]) }
            })
            .await;
        assert_eq!(first, Some(vec![1, 2]));

        let second = cache
            .get_or_fetch("k", Duration::from_secs(30), || {
                calls += 1;
                async { Ok::<_, String>(vec![9]) }
            })
            .await;
        assert_eq!(second, Some(vec![1, 2]));
        assert_eq!(calls, 1);

        clock.advance(chrono::Duration::seconds(30));
        let third = cache
            .get_or_fetch("k", Duration::from_secs(30), || async { Ok::<_, String>(vec![3]) })
            .await;
        assert_eq!(third, Some(vec![3]));
    }

    #[tokio::test]
    async fn test_get_or_fetch_failure_returns_none() {
        let (cache, _store, _clock) = test_cache();

        let result: Option<Vec<i32>> = cache
            .get_or_fetch("k", DEFAULT_TTL, || async { Err("offline".to_string()) })
            .await;

        assert_eq!(result, None);
        assert_eq!(cache.get::<Vec<i32>>("k"), None);
    }
}
