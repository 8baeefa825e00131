//! Hikari CLI - headless catalog and stream inspection
//!
//! Features:
//! - Catalog listing and search against a configured backend
//! - Release detail and episode listing
//! - Quality-ladder resolution for an episode
//! - Manifest probing (segment listing, accessibility checks)

use clap::{Parser, Subcommand};

mod commands;
mod output;

/// Hikari CLI - catalog and streaming inspection toolkit
#[derive(Parser)]
#[command(name = "hikari-cli")]
#[command(version)]
#[command(about = "Catalog browsing and stream inspection for Hikari", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Override the backend API URL for this invocation
    #[arg(long)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the latest releases
    Latest,

    /// List one catalog page
    Catalog {
        /// 0-based page index
        #[arg(short, long, default_value = "0")]
        page: u32,
    },

    /// Search the catalog
    Search {
        /// Search query (minimum 3 characters)
        query: String,
    },

    /// Show a release with its episode list
    Release {
        /// Release identifier
        id: u64,
    },

    /// Resolve the quality ladder for an episode
    Variants {
        /// Episode identifier (UUID)
        episode: String,
    },

    /// Probe a stream manifest
    Probe {
        /// Manifest URL
        manifest: String,

        /// Number of segments to test for accessibility
        #[arg(short, long, default_value = "0")]
        segments: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "debug"
    } else {
        "info,reqwest=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string()))
        .init();

    tracing::debug!(version = hikari_core::VERSION, "starting hikari-cli");

    let backend = commands::backend(cli.api_url.clone())?;

    match cli.command {
        Commands::Latest => commands::latest(&backend, &cli.format).await,
        Commands::Catalog { page } => commands::catalog(&backend, page, &cli.format).await,
        Commands::Search { query } => commands::search(&backend, &query, &cli.format).await,
        Commands::Release { id } => commands::release(&backend, id, &cli.format).await,
        Commands::Variants { episode } => {
            commands::variants(backend.clone(), &episode, &cli.format).await
        }
        Commands::Probe { manifest, segments } => {
            commands::probe(&manifest, segments, &cli.format).await
        }
    }
}
