//! # Dinemap CLI (`dinemap`)
//!
//! Runs the HTTP server and offers offline access to the ingestion
//! pipeline and the record store.
//!
//! ## Usage
//!
//! ```bash
//! dinemap --config ./config/dinemap.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `dinemap serve` | Start the HTTP server |
//! | `dinemap extract <file>` | Scrape a saved page and print the records, without storing |
//! | `dinemap import <file>` | Scrape a saved page and append new records to the store |
//! | `dinemap list` | Print the stored records |
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`
//! (default `info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use dinemap::config::{self, ExtractionStrategy, Secrets};
use dinemap::{extract, ingest, server, store};

/// Dinemap: restaurant map backend and listing-page importer.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/dinemap.example.toml` for a full example.
#[derive(Parser)]
#[command(name = "dinemap", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/dinemap.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    ///
    /// Reads ADMIN_USERNAME, ADMIN_PASSWORD and JWT_SECRET from the
    /// environment. Without them the listing endpoint still works but
    /// login and uploads fail.
    Serve,

    /// Extract restaurants from a saved listing page without storing them.
    ///
    /// Falls back to default settings when the config file is missing.
    Extract {
        /// Saved page (HTML or MHTML).
        file: PathBuf,

        /// Override `[extraction].strategy`: `search_anchors` or `place_cards`.
        #[arg(long)]
        strategy: Option<ExtractionStrategy>,
    },

    /// Import a saved listing page into the configured store.
    Import {
        /// Saved page (HTML or MHTML).
        file: PathBuf,
    },

    /// List the records in the configured store.
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Extraction is a dry run and works without a config file.
    if let Commands::Extract { file, strategy } = &cli.command {
        let cfg = config::load_config(&cli.config).unwrap_or_else(|_| config::Config::minimal());
        return extract::run_extract(&cfg, file, *strategy);
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg, Secrets::from_env()).await?;
        }
        Commands::Import { file } => {
            ingest::run_import(&cfg, &file).await?;
        }
        Commands::List => {
            store::run_list(&cfg).await?;
        }
        Commands::Extract { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
