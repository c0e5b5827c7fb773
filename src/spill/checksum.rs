//! CRC32 checksums for spill records
//!
//! Uses CRC32 (IEEE polynomial). Every record read from a spill file is
//! verified; a mismatch is reported as corruption, never skipped.

use crc32fast::Hasher;

/// Computes a CRC32 checksum over the provided data.
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Computes a CRC32 checksum over a record's length prefix and payload.
pub fn record_checksum(length_prefix: &[u8; 4], payload: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(length_prefix);
    hasher.update(payload);
    hasher.finalize()
}
