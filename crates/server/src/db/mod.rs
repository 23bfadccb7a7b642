//! Vote store access.
//!
//! # Table: `votes`
//!
//! One row per `(item_id, user_id)` pair; the row's presence is the vote.
//! The primary key on `(item_id, user_id)` is what keeps concurrent toggles
//! from producing duplicate votes.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p lovevote-cli -- migrate
//! ```

pub mod memory;
pub mod votes;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use lovevote_core::{AnonymousId, ItemId, VoteRegistry, VoteTally};

pub use memory::MemoryVoteStore;
pub use votes::VoteRepository;

/// Errors from the vote store.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
/// * `max_connections` - Upper bound on pooled connections
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(
    database_url: &secrecy::SecretString,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// The store the vote endpoint is bound to.
///
/// Cheap to clone: both variants share their underlying storage.
#[derive(Clone, Debug)]
pub enum VoteStore {
    /// `PostgreSQL` `votes` table.
    Postgres(PgPool),
    /// Process-local store.
    Memory(MemoryVoteStore),
}

impl VoteStore {
    /// Create an empty in-memory store.
    #[must_use]
    pub fn memory() -> Self {
        Self::Memory(MemoryVoteStore::default())
    }

    /// Short backend name for logs.
    #[must_use]
    pub const fn backend(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::Memory(_) => "memory",
        }
    }

    /// Global snapshot: every voted item with its count, with the voter's own
    /// items marked loved.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be queried.
    pub async fn snapshot(
        &self,
        voter: Option<&AnonymousId>,
    ) -> Result<VoteRegistry, RepositoryError> {
        match self {
            Self::Postgres(pool) => VoteRepository::new(pool).snapshot(voter).await,
            Self::Memory(store) => Ok(store.snapshot(voter)),
        }
    }

    /// Tally of a single item.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be queried.
    pub async fn tally(
        &self,
        item_id: &ItemId,
        voter: Option<&AnonymousId>,
    ) -> Result<VoteTally, RepositoryError> {
        match self {
            Self::Postgres(pool) => VoteRepository::new(pool).tally(item_id, voter).await,
            Self::Memory(store) => Ok(store.tally(item_id, voter)),
        }
    }

    /// Tallies of several items, including items nobody has voted for.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be queried.
    pub async fn tallies(
        &self,
        item_ids: &[ItemId],
        voter: Option<&AnonymousId>,
    ) -> Result<VoteRegistry, RepositoryError> {
        match self {
            Self::Postgres(pool) => VoteRepository::new(pool).tallies(item_ids, voter).await,
            Self::Memory(store) => Ok(store.tallies(item_ids, voter)),
        }
    }

    /// Flip the voter's vote on an item, returning whether it is now loved.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be modified.
    pub async fn toggle(
        &self,
        item_id: &ItemId,
        voter: &AnonymousId,
    ) -> Result<bool, RepositoryError> {
        match self {
            Self::Postgres(pool) => VoteRepository::new(pool).toggle(item_id, voter).await,
            Self::Memory(store) => Ok(store.toggle(item_id, voter)),
        }
    }

    /// Check that the store is reachable.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store cannot be reached.
    pub async fn ping(&self) -> Result<(), RepositoryError> {
        match self {
            Self::Postgres(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
                Ok(())
            }
            Self::Memory(_) => Ok(()),
        }
    }
}

/// Convert a SQL `COUNT(*)` into a vote count.
fn vote_count(count: i64) -> Result<u64, RepositoryError> {
    u64::try_from(count)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative vote count: {count}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_vote_count_conversion() {
        assert_eq!(vote_count(3).unwrap(), 3);
        assert!(matches!(
            vote_count(-1),
            Err(RepositoryError::DataCorruption(_))
        ));
    }

    #[tokio::test]
    async fn test_memory_store_through_enum() {
        let store = VoteStore::memory();
        assert_eq!(store.backend(), "memory");
        store.ping().await.unwrap();

        let item = ItemId::parse("abc").unwrap();
        let voter = AnonymousId::parse("u1").unwrap();

        assert!(store.toggle(&item, &voter).await.unwrap());
        assert_eq!(
            store.tally(&item, Some(&voter)).await.unwrap(),
            VoteTally::new(1, true)
        );
    }
}
