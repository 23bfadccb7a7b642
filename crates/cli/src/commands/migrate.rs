//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! lovevote-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `LOVEVOTE_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//!
//! # Migration Files
//!
//! `crates/server/migrations/`

use secrecy::ExposeSecret;
use sqlx::PgPool;

use super::{CommandError, database_url};

/// Apply pending migrations to the vote database.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the database cannot be
/// reached, or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let database_url = database_url()?;

    tracing::info!("Connecting to vote database...");
    let pool = PgPool::connect(database_url.expose_secret()).await?;

    tracing::info!("Running vote migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Vote migrations complete!");
    Ok(())
}
