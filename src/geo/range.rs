//! Byte ranges over tiered space-filling-curve keys
//!
//! Key layout: one tier byte followed by the big-endian cell position, using
//! the fewest bytes that hold `2 * tier` bits (at least one).

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::GeoError;

/// Highest supported tier (62 position bits)
pub const MAX_TIER: u8 = 31;

/// Inclusive range of byte keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ByteRange {
    pub start: Vec<u8>,
    pub end: Vec<u8>,
}

impl ByteRange {
    /// Range over `[start, end]`; fails if `start > end`.
    pub fn new(start: Vec<u8>, end: Vec<u8>) -> Result<Self, GeoError> {
        if start > end {
            return Err(GeoError::InvertedRange {
                start: to_hex(&start),
                end: to_hex(&end),
            });
        }
        Ok(Self { start, end })
    }

    /// Range from hex-encoded keys.
    pub fn from_hex(start: &str, end: &str) -> Result<Self, GeoError> {
        Self::new(from_hex(start)?, from_hex(end)?)
    }

    /// Range over cell positions `[start, end]` of one tier.
    pub fn for_tier(tier: u8, start: u64, end: u64) -> Result<Self, GeoError> {
        Self::new(tier_key(tier, start)?, tier_key(tier, end)?)
    }

    /// Returns whether `key` falls inside the range.
    pub fn contains(&self, key: &[u8]) -> bool {
        self.start.as_slice() <= key && key <= self.end.as_slice()
    }

    /// Returns whether `next` starts inside this range or immediately after it.
    fn touches(&self, next: &ByteRange) -> bool {
        next.start <= self.end || successor(&self.end).as_deref() == Some(next.start.as_slice())
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", to_hex(&self.start), to_hex(&self.end))
    }
}

/// Key for cell `position` at `tier`.
pub fn tier_key(tier: u8, position: u64) -> Result<Vec<u8>, GeoError> {
    if tier > MAX_TIER {
        return Err(GeoError::InvalidTier(tier));
    }
    let width = position_width(tier);
    let bits = 2 * u32::from(tier);
    if bits < 64 && position >> bits != 0 {
        return Err(GeoError::PositionOutOfRange { tier, position });
    }

    let mut key = Vec::with_capacity(1 + width);
    key.push(tier);
    key.extend_from_slice(&position.to_be_bytes()[8 - width..]);
    Ok(key)
}

/// Tier byte of a key.
pub fn decode_tier(key: &[u8]) -> Result<u8, GeoError> {
    key.first().copied().ok_or(GeoError::EmptyKey)
}

/// Cell position of a key.
pub fn decode_position(key: &[u8]) -> Result<u64, GeoError> {
    let tier = decode_tier(key)?;
    let bytes = &key[1..];
    if bytes.is_empty() || bytes.len() > 8 || tier > MAX_TIER {
        return Err(GeoError::MalformedKey(to_hex(key)));
    }
    Ok(bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
}

/// Merge overlapping and contiguous ranges into a sorted, non-overlapping cover.
pub fn coalesce(mut ranges: Vec<ByteRange>) -> Vec<ByteRange> {
    ranges.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.end.cmp(&b.end)));

    let mut merged: Vec<ByteRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if last.touches(&range) => {
                if range.end > last.end {
                    last.end = range.end;
                }
            }
            _ => merged.push(range),
        }
    }
    merged
}

/// Returns whether `ranges` is sorted with no two ranges sharing a key.
pub fn is_non_overlapping(ranges: &[ByteRange]) -> bool {
    ranges
        .windows(2)
        .all(|pair| pair[0].end.cmp(&pair[1].start) == Ordering::Less)
}

fn position_width(tier: u8) -> usize {
    ((2 * usize::from(tier) + 7) / 8).max(1)
}

/// Next key of the same length, or `None` if every byte is 0xff.
fn successor(key: &[u8]) -> Option<Vec<u8>> {
    let mut next = key.to_vec();
    for byte in next.iter_mut().rev() {
        if *byte == u8::MAX {
            *byte = 0;
        } else {
            *byte += 1;
            return Some(next);
        }
    }
    None
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn from_hex(hex: &str) -> Result<Vec<u8>, GeoError> {
    if hex.len() % 2 != 0 || !hex.is_ascii() {
        return Err(GeoError::MalformedKey(hex.to_string()));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| GeoError::MalformedKey(hex.to_string())))
        .collect()
}
