//! Spill storage
//!
//! Concrete handlers and the on-disk format used when a sorted set is
//! persisted.
//!
//! # Design Principles
//!
//! - Every record is CRC32 checksummed and verified on read
//! - The element count is a fixed-width trailer written last
//! - Corruption is reported with its byte offset, never skipped
//! - Spill files are named and swept per directory prefix

mod checksum;
mod config;
mod directory;
mod file;
mod memory;
mod record;

pub use checksum::compute_checksum;
pub use config::{ConfigError, SpillConfig};
pub use directory::{SpillDirectory, SPILL_EXTENSION};
pub use file::{LocalFileHandler, DEFAULT_WRITE_BUFFER};
pub use memory::{MemoryHandler, StreamStats};
pub use record::{encode_record, encode_trailer, RECORD_OVERHEAD, TRAILER_LEN};
