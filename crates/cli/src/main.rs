//! Lovevote CLI - Database migrations and vote inspection.
//!
//! # Usage
//!
//! ```bash
//! # Run vote database migrations
//! lovevote-cli migrate
//!
//! # Print the global snapshot
//! lovevote-cli snapshot
//!
//! # Print the global snapshot with one voter's loves marked
//! lovevote-cli snapshot --user 3f2c9a1e-...
//!
//! # Print one item's tally
//! lovevote-cli tally --item sunset-print
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `snapshot` - Print every voted item as JSON
//! - `tally` - Print one item's tally as JSON

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

use commands::CommandError;

#[derive(Parser)]
#[command(name = "lovevote-cli")]
#[command(author, version, about = "Lovevote CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Print the global vote snapshot
    Snapshot {
        /// Anonymous voter id whose loves are marked
        #[arg(short, long)]
        user: Option<String>,
    },
    /// Print the tally of one item
    Tally {
        /// Item id
        #[arg(short, long)]
        item: String,

        /// Anonymous voter id
        #[arg(short, long)]
        user: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await,
        Commands::Snapshot { user } => commands::votes::snapshot(user.as_deref()).await,
        Commands::Tally { item, user } => commands::votes::tally(&item, user.as_deref()).await,
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_tally() {
        let cli = Cli::try_parse_from(["lovevote-cli", "tally", "--item", "abc", "-u", "u1"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Tally { item, user: Some(user) }) if item == "abc" && user == "u1"
        ));
    }
}
