//! CLI command implementations
//!
//! Spill files are read with `serde_json::Value` elements, so any file
//! written by this crate can be inspected regardless of its element type.

use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::{json, Value};

use crate::sortedset::{ElementReader, ReaderScope, TypedFileHandler};
use crate::spill::{LocalFileHandler, SpillConfig, SpillDirectory};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};

/// Summary of one spill file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InspectReport {
    pub path: String,
    pub bytes: u64,
    pub count: u64,
    pub first: Option<Value>,
    pub last: Option<Value>,
}

/// Result of a full verification scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub path: String,
    pub records: u64,
    pub count: u64,
}

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

/// Run a specific command
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Inspect { file } => write_json(&inspect(&file)?),
        Command::Verify { file } => write_json(&verify(&file)?),
        Command::Sweep { config } => {
            let removed = sweep(&config)?;
            write_json(&json!({ "removed": removed }))
        }
    }
}

/// Read the trailer and the first and last elements of a spill file.
pub fn inspect(file: &Path) -> CliResult<InspectReport> {
    let handler = open_file(file)?;
    let bytes = handler.size()?;

    let mut reader = ReaderScope::open(&handler)?;
    let count = reader.read_count()?;
    let first = reader.read()?;
    let mut last = first.clone();
    while let Some(element) = reader.read()? {
        last = Some(element);
    }

    Ok(InspectReport {
        path: file.display().to_string(),
        bytes,
        count,
        first,
        last,
    })
}

/// Read every record and check the trailer count against the records read.
pub fn verify(file: &Path) -> CliResult<VerifyReport> {
    let handler = open_file(file)?;

    let mut reader = ReaderScope::open(&handler)?;
    let mut records: u64 = 0;
    while reader.read()?.is_some() {
        records += 1;
    }
    let count = reader.read_count()?;

    if records != count {
        return Err(CliError::verify_failed(format!(
            "Trailer count {} does not match {} records in {}",
            count,
            records,
            file.display()
        )));
    }

    Ok(VerifyReport {
        path: file.display().to_string(),
        records,
        count,
    })
}

/// Delete every spill file in the configured directory.
pub fn sweep(config_path: &Path) -> CliResult<usize> {
    let config = SpillConfig::load(config_path)?;
    let directory = SpillDirectory::open(&config)?;
    Ok(directory.sweep()?)
}

fn open_file(file: &Path) -> CliResult<LocalFileHandler<Value>> {
    if !file.is_file() {
        return Err(CliError::io_error(format!("No such spill file: {}", file.display())));
    }
    Ok(LocalFileHandler::new(file))
}

fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, value)?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}
