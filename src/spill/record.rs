//! Spill file layout
//!
//! ```text
//! +------------------+
//! | Record 0         |  Length (u32 LE) | Payload (JSON) | Checksum (u32 LE)
//! +------------------+
//! | ...              |
//! +------------------+
//! | Record n-1       |
//! +------------------+
//! | Element count    |  u64 LE, written last
//! +------------------+
//! ```
//!
//! The checksum covers the length prefix and the payload. The trailer has a
//! fixed width so a reader can obtain the count from `file_size - 8` without
//! decoding any element, and element reading stops at that same offset.

use std::io::Read;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::checksum::record_checksum;
use crate::sortedset::{HandlerError, HandlerResult};

/// Width of the trailing element count
pub const TRAILER_LEN: u64 = 8;

/// Bytes a record adds around its payload (length prefix + checksum)
pub const RECORD_OVERHEAD: u64 = 8;

/// Serialize one element into a framed record.
pub fn encode_record<E: Serialize>(element: &E) -> HandlerResult<Vec<u8>> {
    let payload = serde_json::to_vec(element).map_err(|e| HandlerError::Codec(e.to_string()))?;
    let length = u32::try_from(payload.len())
        .map_err(|_| HandlerError::Codec(format!("Element too large: {} bytes", payload.len())))?;
    let prefix = length.to_le_bytes();
    let checksum = record_checksum(&prefix, &payload);

    let mut record = Vec::with_capacity(payload.len() + RECORD_OVERHEAD as usize);
    record.extend_from_slice(&prefix);
    record.extend_from_slice(&payload);
    record.extend_from_slice(&checksum.to_le_bytes());
    Ok(record)
}

/// Encode the trailing element count.
pub fn encode_trailer(count: u64) -> [u8; TRAILER_LEN as usize] {
    count.to_le_bytes()
}

/// Decode the trailing element count.
pub fn decode_trailer(bytes: [u8; TRAILER_LEN as usize]) -> u64 {
    u64::from_le_bytes(bytes)
}

/// Offset at which element data ends and the trailer begins.
pub fn data_end(file_size: u64) -> HandlerResult<u64> {
    file_size
        .checked_sub(TRAILER_LEN)
        .ok_or_else(|| HandlerError::Corruption {
            offset: 0,
            reason: format!(
                "File is {} bytes, shorter than the {} byte trailer",
                file_size, TRAILER_LEN
            ),
        })
}

/// Read and verify one record starting at `offset`.
///
/// `remaining` is the number of element bytes left before the trailer.
/// Returns the element and the number of bytes consumed.
pub fn read_record<R: Read, E: DeserializeOwned>(
    reader: &mut R,
    offset: u64,
    remaining: u64,
) -> HandlerResult<(E, u64)> {
    if remaining < RECORD_OVERHEAD {
        return Err(HandlerError::Corruption {
            offset,
            reason: format!(
                "Truncated record: {} bytes remaining, minimum record size is {}",
                remaining, RECORD_OVERHEAD
            ),
        });
    }

    let mut prefix = [0u8; 4];
    reader.read_exact(&mut prefix).map_err(|e| HandlerError::Corruption {
        offset,
        reason: format!("Failed to read record length: {}", e),
    })?;
    let length = u32::from_le_bytes(prefix) as u64;

    if length + RECORD_OVERHEAD > remaining {
        return Err(HandlerError::Corruption {
            offset,
            reason: format!(
                "Record length {} exceeds remaining element bytes {}",
                length, remaining
            ),
        });
    }

    let mut payload = vec![0u8; length as usize];
    reader.read_exact(&mut payload).map_err(|e| HandlerError::Corruption {
        offset,
        reason: format!("Failed to read record payload: {}", e),
    })?;

    let mut stored = [0u8; 4];
    reader.read_exact(&mut stored).map_err(|e| HandlerError::Corruption {
        offset,
        reason: format!("Failed to read record checksum: {}", e),
    })?;
    let stored = u32::from_le_bytes(stored);
    let computed = record_checksum(&prefix, &payload);

    if stored != computed {
        return Err(HandlerError::Corruption {
            offset,
            reason: format!(
                "Checksum mismatch: computed {:08x}, stored {:08x}",
                computed, stored
            ),
        });
    }

    let element = serde_json::from_slice(&payload).map_err(|e| HandlerError::Codec(e.to_string()))?;
    Ok((element, length + RECORD_OVERHEAD))
}
