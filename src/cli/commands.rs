//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - run: drive the loop from a replay file
//! - check: one restaurant lookup
//! - config: print the effective configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// snitchloop - location-monitoring loop that reports restaurant dwells
#[derive(Parser, Debug)]
#[command(name = "snitchloop")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the loop, taking fixes from a JSON-lines replay file.
    ///
    /// While running, type `cheat` to record a cancellation, `status` to
    /// print the loop status, or `quit` to stop.
    Run {
        /// Replay file with one position per line
        #[arg(short, long)]
        fixes: PathBuf,

        /// Use an in-process API that never matches instead of the backend
        #[arg(long)]
        offline: bool,

        /// Override the user id from the config file
        #[arg(short, long)]
        user_id: Option<String>,
    },

    /// Ask the backend whether a coordinate is inside a known restaurant
    Check {
        /// Latitude in degrees
        #[arg(allow_hyphen_values = true)]
        lat: f64,

        /// Longitude in degrees
        #[arg(allow_hyphen_values = true)]
        lon: f64,
    },

    /// Print the effective configuration as YAML
    Config,
}
