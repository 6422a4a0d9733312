//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Per-domain browser time tracker.
///
/// Follows browser tab, navigation and focus events and records how many
/// seconds each web domain spends in the foreground.
#[derive(Debug, Parser)]
#[command(name = "dt", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Track browser events read as JSON lines from stdin.
    Run,

    /// Show accumulated time per domain.
    Report {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Clear all accumulated time.
    Reset {
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },

    /// Show database location and tracking summary.
    Status,
}
