//! CLI module for spillset
//!
//! Provides command-line maintenance for spill files:
//! - inspect: Report trailer count and first/last element
//! - verify: Full checksum scan plus trailer count check
//! - sweep: Delete orphaned spill files in the configured directory

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::{inspect, run, run_command, sweep, verify, InspectReport, VerifyReport};
pub use errors::{CliError, CliErrorCode, CliResult};
