//! CLI interface for primerblast
//!
//! Command-line surface built with clap's derive API: global flags plus one
//! subcommand per operation.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::LOG_LEVELS;

/// Iterative Primer-BLAST primer design
///
/// Searches NCBI Primer-BLAST for specific primer pairs, relaxing the search
/// constraints step by step until acceptable primers are found.
#[derive(Parser, Debug)]
#[command(name = "primerblast")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", value_parser = LOG_LEVELS)]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Design primers for one or more accessions
    Run {
        /// Target accessions (e.g. NM_001062476)
        targets: Vec<String>,

        /// Read additional targets from a file, one per line
        #[arg(short, long, value_name = "PATH")]
        file: Option<PathBuf>,

        /// Contact email sent to NCBI (overrides the config)
        #[arg(long)]
        email: Option<String>,

        /// Seconds between two polls of the same job
        #[arg(long, value_name = "SECS")]
        poll_interval: Option<u64>,

        /// Maximum number of targets searched concurrently
        #[arg(short, long, value_name = "N")]
        jobs: Option<usize>,

        /// Write all reports to this file as JSON
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Show the strict search parameters
    Params,

    /// Show the relaxation ladder
    Ladder,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the configuration file location
    Path,

    /// Show current configuration
    Show,
}
