//! Data-independent log-scale histogram for numeric columns.
//!
//! Bucket edges depend only on the configured resolution, never on the data,
//! so two snapshots computed independently (or two partitions of one pass)
//! always share bucket edges. Each power of two is split into `resolution`
//! equal-width sub-buckets; zero and subnormal magnitudes share bucket 0 and
//! infinities get a dedicated bucket on each side.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default number of sub-buckets per power of two.
pub const DEFAULT_HISTOGRAM_RESOLUTION: u32 = 4;

/// Largest supported resolution.
pub const MAX_HISTOGRAM_RESOLUTION: u32 = 64;

// Shifts binary exponents (>= -1022 for normal values) into positive territory.
const EXPONENT_OFFSET: i64 = 1100;
const INFINITY_BUCKET: i64 = i64::MAX;

/// Rounds a requested resolution to a supported power of two.
pub fn normalize_resolution(resolution: u32) -> u32 {
    resolution
        .clamp(1, MAX_HISTOGRAM_RESOLUTION)
        .next_power_of_two()
}

/// Maps a finite or infinite, non-NaN value to its bucket index.
pub fn bucket_index(value: f64, resolution: u32) -> i64 {
    let magnitude = value.abs();
    if magnitude < f64::MIN_POSITIVE {
        return 0;
    }
    let sign = if value < 0.0 { -1 } else { 1 };
    if magnitude.is_infinite() {
        return sign * INFINITY_BUCKET;
    }

    let mut exponent = magnitude.log2().floor() as i32;
    let mut mantissa = magnitude / 2f64.powi(exponent);
    // log2 rounding can land one exponent off near powers of two
    if mantissa < 1.0 {
        exponent -= 1;
        mantissa *= 2.0;
    } else if mantissa >= 2.0 {
        exponent += 1;
        mantissa /= 2.0;
    }

    let resolution = resolution as i64;
    let sub = (((mantissa - 1.0) * resolution as f64).floor() as i64).clamp(0, resolution - 1);
    sign * ((exponent as i64 + EXPONENT_OFFSET) * resolution + sub + 1)
}

/// Returns the edges of a bucket.
///
/// Positive buckets are `[lower, upper)`; negative buckets mirror them and
/// are therefore `(lower, upper]`.
pub fn bucket_bounds(index: i64, resolution: u32) -> (f64, f64) {
    if index == 0 {
        return (-f64::MIN_POSITIVE, f64::MIN_POSITIVE);
    }
    let magnitude = index.unsigned_abs() as i64;
    let (lower, upper) = if magnitude == INFINITY_BUCKET {
        (f64::MAX, f64::INFINITY)
    } else {
        let resolution = resolution as i64;
        let slot = magnitude - 1;
        let exponent = (slot / resolution - EXPONENT_OFFSET) as i32;
        let sub = slot % resolution;
        let base = 2f64.powi(exponent);
        let width = base / resolution as f64;
        (base + sub as f64 * width, base + (sub + 1) as f64 * width)
    };
    if index < 0 {
        (-upper, -lower)
    } else {
        (lower, upper)
    }
}

/// Re-expresses a bucket index at a coarser resolution.
///
/// Both resolutions must be powers of two with `to <= from`.
pub fn coarsen_index(index: i64, from: u32, to: u32) -> i64 {
    let magnitude = index.unsigned_abs() as i64;
    if index == 0 || magnitude == INFINITY_BUCKET || from == to {
        return index;
    }
    let (from, to) = (from as i64, to as i64);
    let slot = magnitude - 1;
    let exponent_slot = slot / from;
    let sub = slot % from;
    index.signum() * (exponent_slot * to + sub * to / from + 1)
}

/// One bucket of a [`NumericHistogram`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBucket {
    /// Stable bucket index for the histogram's resolution.
    pub index: i64,
    /// Lower edge of the bucket.
    #[serde(with = "super::float_repr")]
    pub lower_bound: f64,
    /// Upper edge of the bucket.
    #[serde(with = "super::float_repr")]
    pub upper_bound: f64,
    /// Number of values in this bucket.
    pub count: u64,
}

/// Sparse histogram over non-empty buckets, ordered by bucket index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericHistogram {
    pub resolution: u32,
    pub buckets: Vec<HistogramBucket>,
}

impl NumericHistogram {
    /// Builds the snapshot form from raw bucket counts.
    pub fn from_counts(resolution: u32, counts: &BTreeMap<i64, u64>) -> Self {
        let buckets = counts
            .iter()
            .map(|(&index, &count)| {
                let (lower_bound, upper_bound) = bucket_bounds(index, resolution);
                HistogramBucket {
                    index,
                    lower_bound,
                    upper_bound,
                    count,
                }
            })
            .collect();
        Self {
            resolution,
            buckets,
        }
    }

    /// Total number of values across buckets.
    pub fn total_count(&self) -> u64 {
        self.buckets.iter().map(|b| b.count).sum()
    }

    /// Bucket counts keyed by index at the requested (coarser or equal) resolution.
    pub fn counts_at(&self, resolution: u32) -> BTreeMap<i64, u64> {
        let mut counts = BTreeMap::new();
        for bucket in &self.buckets {
            let index = coarsen_index(bucket.index, self.resolution, resolution);
            *counts.entry(index).or_insert(0) += bucket.count;
        }
        counts
    }
}
