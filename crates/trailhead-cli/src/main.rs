use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use trailhead_models::{Config, Profile};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "trailhead", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the catalog database (default: ~/.local/share/trailhead/catalog.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Deployment profile: local (Ollama) or hosted (OpenAI-compatible)
    #[arg(long, global = true)]
    profile: Option<Profile>,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Load the sample outdoor gear catalog into an empty database
    Seed,
    /// List every catalog item
    Items,
    /// Keyword search over item names and descriptions
    ///
    /// Plain substring matching, no embeddings involved. Useful for checking
    /// what the catalog holds before trying a semantic query.
    Search {
        /// Text to look for
        term: String,
    },
    /// Rebuild the vector index from the catalog
    ///
    /// Embeds every catalog item with the profile's embedding model and
    /// writes the resulting index snapshot to disk, where 'trailhead ask'
    /// picks it up. Items that fail to embed are reported and skipped; the
    /// rest of the catalog is still indexed.
    ///
    /// Running it again over an unchanged catalog produces the same index.
    Index,
    /// Ask a natural-language question about the catalog
    ///
    /// Finds the single closest catalog item. If its similarity clears the
    /// profile's score threshold the answer is grounded in that item;
    /// otherwise the assistant says no product matched. Model failures
    /// degrade to an apologetic message rather than an error exit.
    Ask {
        /// The question, e.g. "something to keep me dry on a hike"
        query: String,

        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },
    /// Show catalog and index status
    Status,
    /// Inspect or initialise configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, clap::Subcommand)]
enum ConfigCommand {
    /// Show the effective configuration
    Show,
    /// Print one value, or the whole config file when no key is given
    Get {
        /// Dotted key, e.g. search.score_threshold
        key: Option<String>,
    },
    /// Print the config file path
    Path,
    /// Print an example config file
    Example,
    /// Create the config file if it does not exist
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        // Config commands work on the raw file and must not fail on bad values.
        Commands::Config(cmd) => match cmd {
            ConfigCommand::Show => commands::config::show_config(cli.profile),
            ConfigCommand::Get { key } => commands::config::get_config(key.as_deref()),
            ConfigCommand::Path => commands::config::show_path(),
            ConfigCommand::Example => commands::config::show_example(),
            ConfigCommand::Init => commands::config::init_config(),
        },
        command => run(command, cli.db, cli.profile).await,
    }
}

async fn run(command: Commands, db: Option<PathBuf>, profile: Option<Profile>) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(db) = db {
        config.database_path = db;
    }
    if let Some(profile) = profile {
        config.profile = profile;
    }

    // Ensure database directory exists
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create data directory")?;
    }

    match command {
        Commands::Seed => commands::seed(&config.database_path)?,
        Commands::Items => commands::list_items(&config.database_path)?,
        Commands::Search { term } => commands::keyword_search(&config.database_path, &term)?,
        Commands::Index => commands::run_index(&config.resolve()?).await?,
        Commands::Ask { query, json } => commands::run_ask(&config.resolve()?, &query, json).await?,
        Commands::Status => commands::show_status(&config.resolve()?).await?,
        Commands::Config(_) => {}
    }

    Ok(())
}
