//! Vote repository for `PostgreSQL`.
//!
//! Queries are built at runtime (`sqlx::query_as` / `query_scalar`) so the
//! crate compiles without a live database.

use sqlx::PgPool;
use tracing::instrument;

use lovevote_core::{AnonymousId, ItemId, VoteRegistry, VoteTally};

use super::{RepositoryError, vote_count};

/// Repository for vote database operations.
pub struct VoteRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> VoteRepository<'a> {
    /// Create a new vote repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Build the global snapshot.
    ///
    /// Counts and the voter's own items are read with two statements; a vote
    /// deleted between them leaves a `{count: 0, loved: true}` entry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self, voter), fields(has_voter = voter.is_some()))]
    pub async fn snapshot(
        &self,
        voter: Option<&AnonymousId>,
    ) -> Result<VoteRegistry, RepositoryError> {
        let rows = sqlx::query_as::<_, (ItemId, i64)>(
            r"
            SELECT item_id, COUNT(*) AS count
            FROM votes
            GROUP BY item_id
            ",
        )
        .fetch_all(self.pool)
        .await?;

        let counts = rows
            .into_iter()
            .map(|(item_id, count)| Ok((item_id, vote_count(count)?)))
            .collect::<Result<Vec<_>, RepositoryError>>()?;

        let loved = match voter {
            Some(voter) => {
                sqlx::query_scalar::<_, ItemId>(
                    r"
                    SELECT item_id
                    FROM votes
                    WHERE user_id = $1
                    ",
                )
                .bind(voter)
                .fetch_all(self.pool)
                .await?
            }
            None => Vec::new(),
        };

        Ok(VoteRegistry::from_snapshot(counts, loved))
    }

    /// Tally of a single item.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self, voter), fields(item_id = %item_id, has_voter = voter.is_some()))]
    pub async fn tally(
        &self,
        item_id: &ItemId,
        voter: Option<&AnonymousId>,
    ) -> Result<VoteTally, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            r"
            SELECT COUNT(*)
            FROM votes
            WHERE item_id = $1
            ",
        )
        .bind(item_id)
        .fetch_one(self.pool)
        .await?;

        let loved = match voter {
            Some(voter) => self.exists(item_id, voter).await?,
            None => false,
        };

        Ok(VoteTally::new(vote_count(count)?, loved))
    }

    /// Tallies of several items. Items without votes are present with a zero count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self, item_ids, voter), fields(items = item_ids.len(), has_voter = voter.is_some()))]
    pub async fn tallies(
        &self,
        item_ids: &[ItemId],
        voter: Option<&AnonymousId>,
    ) -> Result<VoteRegistry, RepositoryError> {
        let rows = sqlx::query_as::<_, (ItemId, i64)>(
            r"
            SELECT item_id, COUNT(*) AS count
            FROM votes
            WHERE item_id = ANY($1)
            GROUP BY item_id
            ",
        )
        .bind(item_ids)
        .fetch_all(self.pool)
        .await?;

        let loved = match voter {
            Some(voter) => {
                sqlx::query_scalar::<_, ItemId>(
                    r"
                    SELECT item_id
                    FROM votes
                    WHERE user_id = $1 AND item_id = ANY($2)
                    ",
                )
                .bind(voter)
                .bind(item_ids)
                .fetch_all(self.pool)
                .await?
            }
            None => Vec::new(),
        };

        let mut registry: VoteRegistry = item_ids
            .iter()
            .map(|item_id| (item_id.clone(), VoteTally::default()))
            .collect();
        for (item_id, count) in rows {
            registry.insert(item_id, VoteTally::new(vote_count(count)?, false));
        }
        for item_id in loved {
            let count = registry.get(item_id.as_str()).map_or(0, |tally| tally.count);
            registry.insert(item_id, VoteTally::new(count, true));
        }

        Ok(registry)
    }

    /// Flip the voter's vote on an item.
    ///
    /// Deletes the row if present; otherwise inserts it. Each statement is
    /// atomic on its own. When two toggles race on an absent row, both insert
    /// and the loser hits the primary key: that outcome is reported as
    /// "already loved" rather than as an error.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a statement fails for any
    /// reason other than the duplicate-vote race.
    #[instrument(skip(self, voter), fields(item_id = %item_id))]
    pub async fn toggle(
        &self,
        item_id: &ItemId,
        voter: &AnonymousId,
    ) -> Result<bool, RepositoryError> {
        let deleted = sqlx::query(
            r"
            DELETE FROM votes
            WHERE item_id = $1 AND user_id = $2
            ",
        )
        .bind(item_id)
        .bind(voter)
        .execute(self.pool)
        .await?
        .rows_affected();

        if deleted > 0 {
            return Ok(false);
        }

        let inserted = sqlx::query(
            r"
            INSERT INTO votes (item_id, user_id)
            VALUES ($1, $2)
            ",
        )
        .bind(item_id)
        .bind(voter)
        .execute(self.pool)
        .await;

        insert_outcome(inserted.map(|_| ()))
    }

    /// Whether the voter has loved the item.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists(
        &self,
        item_id: &ItemId,
        voter: &AnonymousId,
    ) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS (
                SELECT 1 FROM votes WHERE item_id = $1 AND user_id = $2
            )
            ",
        )
        .bind(item_id)
        .bind(voter)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }
}

/// Classify the insert half of a toggle. A duplicate key means a concurrent
/// toggle inserted the same vote first, so the item is loved either way.
fn insert_outcome(inserted: Result<(), sqlx::Error>) -> Result<bool, RepositoryError> {
    match inserted {
        Ok(()) => Ok(true),
        Err(sqlx::Error::Database(ref db_err)) if db_err.is_unique_violation() => {
            tracing::debug!("concurrent toggle already inserted the vote");
            Ok(true)
        }
        Err(e) => Err(RepositoryError::Database(e)),
    }
}
