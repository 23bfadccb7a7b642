//! Vote inspection commands.
//!
//! Read the `votes` table through the same store code the server uses and
//! print the result as JSON.

use lovevote_core::{AnonymousId, ItemId};
use lovevote_server::db::{self, VoteStore};

use super::{CommandError, database_url};

async fn connect() -> Result<VoteStore, CommandError> {
    let url = database_url()?;
    let pool = db::create_pool(&url, 2).await?;
    Ok(VoteStore::Postgres(pool))
}

fn parse_voter(user: Option<&str>) -> Result<Option<AnonymousId>, CommandError> {
    Ok(AnonymousId::from_query(user)?)
}

#[allow(clippy::print_stdout)]
fn print_json(value: &impl serde::Serialize) -> Result<(), CommandError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print the global snapshot, optionally marking `user`'s loves.
///
/// # Errors
///
/// Returns an error if the database is unreachable or `user` is invalid.
pub async fn snapshot(user: Option<&str>) -> Result<(), CommandError> {
    let voter = parse_voter(user)?;
    let store = connect().await?;

    let registry = store.snapshot(voter.as_ref()).await?;
    tracing::info!(items = registry.len(), "Snapshot loaded");
    print_json(&registry)
}

/// Print the tally of one item.
///
/// # Errors
///
/// Returns an error if the database is unreachable or an id is invalid.
pub async fn tally(item: &str, user: Option<&str>) -> Result<(), CommandError> {
    let item_id = ItemId::parse(item)?;
    let voter = parse_voter(user)?;
    let store = connect().await?;

    let tally = store.tally(&item_id, voter.as_ref()).await?;
    print_json(&tally)
}
