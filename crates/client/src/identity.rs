//! Anonymous identity provider.

use std::sync::Arc;

use lovevote_core::AnonymousId;
use uuid::Uuid;

use crate::error::StorageError;
use crate::storage::CacheStorage;

/// Storage key of the anonymous identity.
pub const IDENTITY_KEY: &str = "lovevote.anonymous_id";

/// Stable per-installation voter identity, created on first use.
#[derive(Clone)]
pub struct IdentityProvider {
    storage: Arc<dyn CacheStorage>,
}

impl std::fmt::Debug for IdentityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityProvider").finish_non_exhaustive()
    }
}

impl IdentityProvider {
    pub fn new(storage: Arc<dyn CacheStorage>) -> Self {
        Self { storage }
    }

    /// The stored identity, without creating one.
    ///
    /// An unreadable or malformed stored value counts as no identity.
    #[must_use]
    pub fn current(&self) -> Option<AnonymousId> {
        let stored = match self.storage.get(IDENTITY_KEY) {
            Ok(stored) => stored?,
            Err(e) => {
                tracing::debug!(error = %e, "Identity storage unavailable");
                return None;
            }
        };

        match AnonymousId::parse(stored.trim()) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed stored identity");
                None
            }
        }
    }

    /// The stored identity, creating and persisting a UUID v4 if absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if a new identity cannot be persisted; an
    /// unpersisted identity is never returned.
    pub fn get_or_create(&self) -> Result<AnonymousId, StorageError> {
        if let Some(id) = self.current() {
            return Ok(id);
        }

        let fresh = Uuid::new_v4().to_string();
        self.storage.set(IDENTITY_KEY, &fresh)?;
        tracing::debug!("Created anonymous identity");

        AnonymousId::parse(&fresh).map_err(|e| StorageError::Unavailable(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::{FileStorage, MemoryStorage};

    #[test]
    fn test_current_without_identity() {
        let provider = IdentityProvider::new(Arc::new(MemoryStorage::new()));
        assert!(provider.current().is_none());
    }

    #[test]
    fn test_get_or_create_is_stable() {
        let provider = IdentityProvider::new(Arc::new(MemoryStorage::new()));
        let first = provider.get_or_create().unwrap();
        let second = provider.get_or_create().unwrap();

        assert_eq!(first, second);
        assert_eq!(provider.current(), Some(first.clone()));
        assert!(Uuid::parse_str(first.as_str()).is_ok());
    }

    #[test]
    fn test_identity_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let created = IdentityProvider::new(Arc::new(FileStorage::new(dir.path())))
            .get_or_create()
            .unwrap();

        let reopened = IdentityProvider::new(Arc::new(FileStorage::new(dir.path())));
        assert_eq!(reopened.current(), Some(created));
    }

    #[test]
    fn test_blank_stored_identity_is_replaced() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(IDENTITY_KEY, "   ").unwrap();

        let provider = IdentityProvider::new(storage);
        assert!(provider.current().is_none());
        assert!(!provider.get_or_create().unwrap().as_str().is_empty());
    }
}
