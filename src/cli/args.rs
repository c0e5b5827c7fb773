//! CLI argument definitions using clap
//!
//! Commands:
//! - spillset inspect <file>
//! - spillset verify <file>
//! - spillset sweep --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// spillset - inspect and maintain sorted set spill files
#[derive(Parser, Debug)]
#[command(name = "spillset")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Summarize a spill file
    Inspect {
        /// Path to the spill file
        file: PathBuf,
    },

    /// Check every record checksum and the trailing element count
    Verify {
        /// Path to the spill file
        file: PathBuf,
    },

    /// Delete orphaned spill files in the configured directory
    Sweep {
        /// Path to configuration file
        #[arg(long, default_value = "./spillset.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
