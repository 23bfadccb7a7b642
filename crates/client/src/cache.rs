//! Client vote cache.
//!
//! A persisted copy of the last known vote registry, used to render vote
//! state instantly before the network answers. Reads never fail: a missing,
//! corrupt, unreadable or expired entry is simply an empty registry. Writes
//! are best effort.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use lovevote_core::{ItemId, VoteRegistry, VoteTally};
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_CACHE_MAX_AGE;
use crate::storage::CacheStorage;

/// Storage key of the persisted registry.
pub const VOTE_CACHE_KEY: &str = "lovevote.votes.v1";

/// Persisted form: `{"cachedAt": "<RFC3339>", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedRegistry {
    pub cached_at: DateTime<Utc>,
    pub data: VoteRegistry,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CachedRegistryRef<'a> {
    cached_at: DateTime<Utc>,
    data: &'a VoteRegistry,
}

/// Owner of the persisted registry.
#[derive(Clone)]
pub struct VoteCache {
    storage: Arc<dyn CacheStorage>,
    max_age: TimeDelta,
}

impl std::fmt::Debug for VoteCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoteCache")
            .field("max_age", &self.max_age)
            .finish_non_exhaustive()
    }
}

impl VoteCache {
    /// Cache with the default one week freshness window.
    pub fn new(storage: Arc<dyn CacheStorage>) -> Self {
        Self::with_max_age(storage, DEFAULT_CACHE_MAX_AGE)
    }

    /// Cache that treats entries older than `max_age` as a miss.
    pub fn with_max_age(storage: Arc<dyn CacheStorage>, max_age: Duration) -> Self {
        let max_age = TimeDelta::from_std(max_age).unwrap_or(TimeDelta::MAX);
        Self { storage, max_age }
    }

    /// The persisted registry, or an empty one on any miss.
    #[must_use]
    pub fn read(&self) -> VoteRegistry {
        self.load()
            .filter(|cached| self.is_within_max_age(cached.cached_at))
            .map(|cached| cached.data)
            .unwrap_or_default()
    }

    /// Persist `registry` stamped with the current time.
    ///
    /// Failures are logged and otherwise ignored.
    pub fn write(&self, registry: &VoteRegistry) {
        let payload = CachedRegistryRef {
            cached_at: Utc::now(),
            data: registry,
        };

        let json = match serde_json::to_string(&payload) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize vote cache");
                return;
            }
        };

        if let Err(e) = self.storage.set(VOTE_CACHE_KEY, &json) {
            tracing::warn!(error = %e, "Failed to persist vote cache");
        }
    }

    /// Patch a single entry, keeping the others.
    pub fn merge(&self, item_id: &ItemId, tally: VoteTally) {
        let mut registry = self.read();
        registry.insert(item_id.clone(), tally);
        self.write(&registry);
    }

    /// Forget the persisted registry.
    pub fn clear(&self) {
        if let Err(e) = self.storage.remove(VOTE_CACHE_KEY) {
            tracing::warn!(error = %e, "Failed to clear vote cache");
        }
    }

    /// When the persisted registry was written, if there is a readable one.
    #[must_use]
    pub fn cached_at(&self) -> Option<DateTime<Utc>> {
        self.load().map(|cached| cached.cached_at)
    }

    /// Whether a persisted registry exists and is within the freshness window.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.cached_at()
            .is_some_and(|cached_at| self.is_within_max_age(cached_at))
    }

    fn is_within_max_age(&self, cached_at: DateTime<Utc>) -> bool {
        Utc::now().signed_duration_since(cached_at) <= self.max_age
    }

    fn load(&self) -> Option<CachedRegistry> {
        let raw = match self.storage.get(VOTE_CACHE_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::debug!(error = %e, "Vote cache unavailable");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(cached) => Some(cached),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring corrupt vote cache");
                None
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::storage::{FileStorage, MemoryStorage};

    struct BrokenStorage;

    impl CacheStorage for BrokenStorage {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("disabled".to_string()))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("quota exceeded".to_string()))
        }

        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("disabled".to_string()))
        }
    }

    fn item(id: &str) -> ItemId {
        ItemId::parse(id).unwrap()
    }

    fn sample() -> VoteRegistry {
        [
            (item("a"), VoteTally::new(3, true)),
            (item("b"), VoteTally::new(1, false)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_read_empty_when_nothing_stored() {
        let cache = VoteCache::new(Arc::new(MemoryStorage::new()));
        assert!(cache.read().is_empty());
        assert!(cache.cached_at().is_none());
        assert!(!cache.is_fresh());
    }

    #[test]
    fn test_write_then_read() {
        let cache = VoteCache::new(Arc::new(MemoryStorage::new()));
        cache.write(&sample());

        assert_eq!(cache.read(), sample());
        assert!(cache.is_fresh());
    }

    #[test]
    fn test_persisted_format() {
        let storage = Arc::new(MemoryStorage::new());
        let cache = VoteCache::new(storage.clone());
        cache.write(&sample());

        let raw = storage.get(VOTE_CACHE_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value["cachedAt"].is_string());
        assert_eq!(value["data"]["a"]["count"], 3);
        assert_eq!(value["data"]["a"]["loved"], true);
    }

    #[test]
    fn test_corrupt_entry_is_a_miss() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(VOTE_CACHE_KEY, "{not json").unwrap();

        let cache = VoteCache::new(storage);
        assert!(cache.read().is_empty());
    }

    #[test]
    fn test_entry_with_invalid_item_id_is_a_miss() {
        let storage = Arc::new(MemoryStorage::new());
        let raw = format!(
            r#"{{"cachedAt":"{}","data":{{"":{{"count":1,"loved":true}}}}}}"#,
            Utc::now().to_rfc3339()
        );
        storage.set(VOTE_CACHE_KEY, &raw).unwrap();

        let cache = VoteCache::new(storage);
        assert!(cache.read().is_empty());
    }

    #[test]
    fn test_expired_entry_is_a_miss() {
        let storage = Arc::new(MemoryStorage::new());
        let stale = CachedRegistry {
            cached_at: Utc::now() - TimeDelta::days(8),
            data: sample(),
        };
        storage
            .set(VOTE_CACHE_KEY, &serde_json::to_string(&stale).unwrap())
            .unwrap();

        let cache = VoteCache::new(storage);
        assert!(cache.read().is_empty());
        assert!(!cache.is_fresh());
        assert_eq!(cache.cached_at(), Some(stale.cached_at));
    }

    #[test]
    fn test_custom_max_age() {
        let storage = Arc::new(MemoryStorage::new());
        let entry = CachedRegistry {
            cached_at: Utc::now() - TimeDelta::minutes(5),
            data: sample(),
        };
        storage
            .set(VOTE_CACHE_KEY, &serde_json::to_string(&entry).unwrap())
            .unwrap();

        let strict = VoteCache::with_max_age(storage.clone(), Duration::from_secs(60));
        let lenient = VoteCache::with_max_age(storage, Duration::from_secs(3600));
        assert!(strict.read().is_empty());
        assert_eq!(lenient.read(), sample());
    }

    #[test]
    fn test_unavailable_storage_never_fails() {
        let cache = VoteCache::new(Arc::new(BrokenStorage));
        cache.write(&sample());
        cache.merge(&item("a"), VoteTally::new(1, true));
        cache.clear();
        assert!(cache.read().is_empty());
    }

    #[test]
    fn test_merge_keeps_other_entries() {
        let cache = VoteCache::new(Arc::new(MemoryStorage::new()));
        cache.write(&sample());

        cache.merge(&item("b"), VoteTally::new(2, true));
        cache.merge(&item("c"), VoteTally::new(0, false));

        let registry = cache.read();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.get("a"), Some(&VoteTally::new(3, true)));
        assert_eq!(registry.get("b"), Some(&VoteTally::new(2, true)));
        assert_eq!(registry.get("c"), Some(&VoteTally::new(0, false)));
    }

    #[test]
    fn test_survives_restart_with_file_storage() {
        let dir = tempfile::tempdir().unwrap();

        VoteCache::new(Arc::new(FileStorage::new(dir.path()))).write(&sample());

        let reopened = VoteCache::new(Arc::new(FileStorage::new(dir.path())));
        assert_eq!(reopened.read(), sample());
    }

    #[test]
    fn test_clear() {
        let cache = VoteCache::new(Arc::new(MemoryStorage::new()));
        cache.write(&sample());
        cache.clear();
        assert!(cache.read().is_empty());
    }
}
