//! # Governance Harness CLI (`govx`)
//!
//! The `govx` binary drives the governance pipeline: database
//! initialization, document ingestion, hybrid search, listings, and the
//! HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! govx --config ./config/govx.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `govx init` | Create the SQLite database and run schema migrations |
//! | `govx ingest <file> --version <v>` | Chunk, tag, embed, and store a document version |
//! | `govx search "<query>"` | Search governance chunks (vector or keyword) |
//! | `govx sections` | List chunk metadata with embedding flags |
//! | `govx version` | Show the current version and embedding coverage |
//! | `govx serve` | Start the JSON HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the database
//! govx init --config ./config/govx.toml
//!
//! # Ingest a governance document
//! govx ingest AGENT.md --version 1.4.0
//!
//! # Search with a role filter
//! govx search "release approval" --role BACKEND --limit 3
//!
//! # Start the HTTP API
//! govx serve
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use governance_harness::{config, ingest, migrate, search, sections, server, version};

/// Governance Harness CLI — governance-document ingestion and hybrid
/// retrieval for agent fleets.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/govx.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "govx",
    about = "Governance Harness — governance-document ingestion and hybrid retrieval",
    version,
    long_about = "Governance Harness ingests a versioned, heading-structured policy document \
    (chunking, role/gate tagging, optional embeddings via Ollama, Voyage AI, or OpenAI) and \
    answers queries by vector similarity or deterministic keyword scoring."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/govx.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the governance_chunks table.
    /// Idempotent — running it multiple times is safe.
    Init,

    /// Ingest a governance document version.
    ///
    /// Chunks the document by headings, tags roles and gate types, embeds
    /// chunks when a provider is configured, and fully replaces the
    /// version's stored chunks. An embedding failure degrades to an
    /// unembedded ingestion rather than aborting.
    Ingest {
        /// Path to the document (markdown-style '#'/'##'/'###' headings).
        file: PathBuf,

        /// Version label for this document snapshot.
        #[arg(long)]
        version: String,
    },

    /// Search governance chunks.
    ///
    /// Uses vector similarity when a provider is configured and the corpus
    /// has embeddings; otherwise keyword scoring. The output names the
    /// mode that served the query.
    Search {
        /// The search query string.
        query: String,

        /// Boost/filter by an affected role tag (e.g. QA, BACKEND).
        #[arg(long)]
        role: Option<String>,

        /// Maximum number of results.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// List chunk metadata with embedding flags.
    Sections {
        /// Restrict the listing to one version label.
        #[arg(long)]
        version: Option<String>,
    },

    /// Show the current governance version and embedding coverage.
    Version,

    /// Start the JSON HTTP server.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&config).await?;
            println!("Database initialized at {}", config.db.path.display());
        }
        Commands::Ingest { file, version } => {
            ingest::run_ingest(&config, &file, &version).await?;
        }
        Commands::Search { query, role, limit } => {
            search::run_search(&config, &query, role, limit).await?;
        }
        Commands::Sections { version } => {
            sections::run_sections(&config, version).await?;
        }
        Commands::Version => {
            version::run_version(&config).await?;
        }
        Commands::Serve => {
            server::run_server(&config).await?;
        }
    }

    Ok(())
}
