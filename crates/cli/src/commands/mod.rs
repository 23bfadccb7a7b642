//! CLI subcommands.

pub mod migrate;
pub mod votes;

use secrecy::SecretString;
use thiserror::Error;

use lovevote_core::IdError;
use lovevote_server::db::RepositoryError;

/// Errors from CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Vote store error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(#[from] IdError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Database URL from `LOVEVOTE_DATABASE_URL`, falling back to `DATABASE_URL`.
pub fn database_url() -> Result<SecretString, CommandError> {
    dotenvy::dotenv().ok();

    std::env::var("LOVEVOTE_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("LOVEVOTE_DATABASE_URL"))
}
