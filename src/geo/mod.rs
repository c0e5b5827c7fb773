//! Geospatial range optimization hooks
//!
//! Index lookups for a geometry are expressed as lists of inclusive byte
//! ranges over tiered cell keys. A `RangeOptimizer` trims such a list for a
//! geometry; whatever it does, its output must be a sorted, non-overlapping
//! cover, which `coalesce` produces and `is_non_overlapping` checks.

mod range;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use range::{coalesce, decode_position, decode_tier, is_non_overlapping, tier_key, ByteRange, MAX_TIER};

/// Geospatial range errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GeoError {
    #[error("Range start {start} is after end {end}")]
    InvertedRange { start: String, end: String },

    #[error("Tier {0} exceeds the maximum tier")]
    InvalidTier(u8),

    #[error("Position {position} does not fit tier {tier}")]
    PositionOutOfRange { tier: u8, position: u64 },

    #[error("Empty key")]
    EmptyKey,

    #[error("Malformed key: {0}")]
    MalformedKey(String),

    #[error("Invalid optimizer parameters: {0}")]
    InvalidParams(String),

    #[error("Optimization failed: {0}")]
    Optimizer(String),
}

/// Tuning parameters for range optimization
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizerParams {
    /// Bits of curve precision to optimize down to
    pub precision_bits: u32,

    /// Split a range when the geometry covers less than this share of its area
    pub area_ratio: f64,
}

impl Default for OptimizerParams {
    fn default() -> Self {
        Self {
            precision_bits: 2 * u32::from(MAX_TIER),
            area_ratio: 0.75,
        }
    }
}

impl OptimizerParams {
    /// Validate field values
    pub fn validate(&self) -> Result<(), GeoError> {
        if self.precision_bits == 0 || self.precision_bits > 2 * u32::from(MAX_TIER) {
            return Err(GeoError::InvalidParams(format!(
                "precision_bits must be in 1..={}, got {}",
                2 * u32::from(MAX_TIER),
                self.precision_bits
            )));
        }
        if !(self.area_ratio > 0.0 && self.area_ratio <= 1.0) {
            return Err(GeoError::InvalidParams(format!(
                "area_ratio must be in (0, 1], got {}",
                self.area_ratio
            )));
        }
        Ok(())
    }
}

/// Optimizes the byte ranges covering a geometry `G`.
pub trait RangeOptimizer<G> {
    /// Return an optimized, sorted, non-overlapping list of ranges that still
    /// covers `geometry`.
    fn optimize(
        &self,
        geometry: &G,
        ranges: Vec<ByteRange>,
        params: &OptimizerParams,
    ) -> Result<Vec<ByteRange>, GeoError>;
}

/// Optimizer that only merges overlapping and contiguous ranges.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoalescingOptimizer;

impl<G> RangeOptimizer<G> for CoalescingOptimizer {
    fn optimize(
        &self,
        _geometry: &G,
        ranges: Vec<ByteRange>,
        params: &OptimizerParams,
    ) -> Result<Vec<ByteRange>, GeoError> {
        params.validate()?;
        Ok(coalesce(ranges))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_validation() {
        assert!(OptimizerParams::default().validate().is_ok());

        let params = OptimizerParams {
            precision_bits: 0,
            area_ratio: 0.5,
        };
        assert!(matches!(params.validate(), Err(GeoError::InvalidParams(_))));

        let params = OptimizerParams {
            precision_bits: 20,
            area_ratio: 1.5,
        };
        assert!(params.validate().is_err());

        let params = OptimizerParams {
            precision_bits: 20,
            area_ratio: f64::NAN,
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_coalescing_optimizer() {
        let ranges = vec![
            ByteRange::for_tier(4, 10, 20).unwrap(),
            ByteRange::for_tier(4, 0, 9).unwrap(),
        ];
        let optimized = CoalescingOptimizer
            .optimize(&(), ranges, &OptimizerParams::default())
            .unwrap();
        assert_eq!(optimized, vec![ByteRange::for_tier(4, 0, 20).unwrap()]);
        assert!(is_non_overlapping(&optimized));
    }
}
