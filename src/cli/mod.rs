//! Command-line interface for pinsync.

pub mod args;
mod commands;

use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::client::ClientError;

pub use args::ArgsError;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during CLI execution.
#[derive(Debug, Error)]
pub enum CliError {
    /// Argument processing error.
    #[error("{0}")]
    Args(#[from] ArgsError),

    /// Store client error.
    #[error("{0}")]
    Client(#[from] ClientError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The run completed but at least one target had failures.
    #[error("sync finished with failures")]
    SyncFailed,
}

/// Result type for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

// =============================================================================
// CLI Definition
// =============================================================================

/// pinsync - mirrors pinned objects between content-addressed store nodes.
#[derive(Parser, Debug)]
#[command(name = "pinsync", version, about, long_about = None)]
pub struct Cli {
    /// Format the report as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sync pinned files from one store node to others.
    #[command(name = "sync-files")]
    SyncFiles(commands::sync_files::SyncFilesArgs),
}

/// CLI entry point.
pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Command::SyncFiles(args) => args.run(cli.json).await,
    }
}
