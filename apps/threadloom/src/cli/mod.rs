//! # Threadloom CLI Module
//!
//! ## Available Commands
//!
//! - `load` - Load a four-phase dataset directory
//! - `ingest` - Keyword-filtered bulk ingest of raw document files
//! - `status` - Show post counts of a snapshot
//! - `lookup` - Show one post of a snapshot
//! - `serve` - Serve a snapshot over HTTP

mod commands;

use crate::config::Config;
use crate::error::AppError;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Threadloom - conversation thread reconstruction
///
/// Rebuilds reply, quote and retweet threads from collected post records.
#[derive(Parser, Debug)]
#[command(name = "threadloom")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load a dataset directory (initial, enriched, reloaded, users)
    Load {
        /// Dataset root directory
        #[arg(short, long)]
        dataset: PathBuf,

        /// Write a snapshot here after each post phase
        #[arg(short, long)]
        snapshot: Option<PathBuf>,
    },

    /// Ingest raw document files that match the configured keywords
    Ingest {
        /// Directory of record stream files
        #[arg(short, long)]
        input: PathBuf,

        /// Write the resulting registry here
        #[arg(short, long)]
        snapshot: Option<PathBuf>,
    },

    /// Show post counts of a snapshot
    Status {
        /// Snapshot directory
        #[arg(short, long)]
        snapshot: PathBuf,
    },

    /// Show one post of a snapshot
    Lookup {
        /// Snapshot directory
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Post id
        #[arg(long)]
        id: i64,
    },

    /// Serve a snapshot over the read-only HTTP API
    Serve {
        /// Snapshot directory
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Host to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), AppError> {
    let json_mode = cli.json_mode;

    match cli.command {
        Commands::Load { dataset, snapshot } => {
            let config = Config::load(cli.config.as_deref())?;
            cmd_load(&config, &dataset, snapshot.as_deref(), json_mode, cli.verbose).await
        }
        Commands::Ingest { input, snapshot } => {
            let config = Config::load(cli.config.as_deref())?;
            cmd_ingest(&config, &input, snapshot.as_deref(), json_mode).await
        }
        Commands::Status { snapshot } => cmd_status(&snapshot, json_mode),
        Commands::Lookup { snapshot, id } => cmd_lookup(&snapshot, id, json_mode),
        Commands::Serve {
            snapshot,
            host,
            port,
        } => cmd_serve(&snapshot, &host, port).await,
    }
}
