//! Lovevote client.
//!
//! Client side of the anonymous vote system:
//!
//! - [`IdentityProvider`]: per-installation anonymous voter id
//! - [`VoteCache`]: persisted last-known registry for instant render
//! - [`VoteRegistrySync`]: page-level registry, seeded from cache, refreshed once
//! - [`VoteControl`] / [`VoteController`]: per-item optimistic toggle
//! - [`HttpVoteApi`]: `/api/vote` over HTTP
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//!
//! use lovevote_client::{
//!     ClientConfig, FileStorage, HttpVoteApi, IdentityProvider, VoteCache, VoteControl,
//!     VoteController, VoteRegistrySync,
//! };
//! use lovevote_core::ItemId;
//!
//! let config = ClientConfig::from_env()?;
//! let storage = Arc::new(FileStorage::new(".lovevote"));
//! let voter = IdentityProvider::new(storage.clone()).get_or_create()?;
//! let api = Arc::new(HttpVoteApi::new(&config)?);
//!
//! let mut registry = VoteRegistrySync::mount(
//!     Arc::clone(&api),
//!     VoteCache::with_max_age(storage, config.cache_max_age),
//! );
//! registry.refresh(Some(&voter)).await;
//!
//! let item = ItemId::parse("sunset-print")?;
//! let control = VoteControl::new(item.clone()).with_preloaded(registry.tally(item.as_str()));
//! let controller = VoteController::new(api, control);
//! if let Some(tally) = controller.toggle(Some(&voter)).await.committed() {
//!     registry.record(&item, tally);
//! }
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cache;
pub mod config;
pub mod control;
pub mod error;
pub mod identity;
pub mod registry;
pub mod storage;

#[cfg(test)]
mod testing;

pub use api::{HttpVoteApi, VoteApi};
pub use cache::{CachedRegistry, VoteCache};
pub use config::ClientConfig;
pub use control::{ControlPhase, TallySource, ToggleResult, VoteControl, VoteController};
pub use error::{ClientError, StorageError};
pub use identity::IdentityProvider;
pub use registry::{RefreshOutcome, VoteRegistrySync};
pub use storage::{CacheStorage, FileStorage, MemoryStorage};
