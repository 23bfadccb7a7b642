//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::db::VoteStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. The vote store is optional:
/// a server started without a database binding keeps serving and reports
/// the missing binding on every vote request.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    store: Option<VoteStore>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Server configuration
    /// * `store` - Bound vote store, if any
    #[must_use]
    pub fn new(config: ServerConfig, store: Option<VoteStore>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, store }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get the bound vote store.
    #[must_use]
    pub fn store(&self) -> Option<&VoteStore> {
        self.inner.store.as_ref()
    }
}
