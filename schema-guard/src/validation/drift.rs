//! L-infinity distance between two snapshots of the same column.
//!
//! Both sides are reduced to relative frequencies over a shared key space
//! (categorical values, or histogram bucket indices) and the distance is the
//! largest absolute difference over the union of keys. A key missing on one
//! side has frequency 0 there. The result is always in `[0, 1]`.

use std::collections::BTreeMap;

use crate::core::FeatureType;
use crate::statistics::{ColumnStatistics, NumericHistogram, ValueCounts};

/// Distance between relative frequencies of two count maps.
///
/// An empty side (total 0) contributes frequency 0 for every key.
pub fn linf_distance<K: Ord>(
    current: &BTreeMap<K, u64>,
    current_total: u64,
    previous: &BTreeMap<K, u64>,
    previous_total: u64,
) -> f64 {
    let frequency = |counts: &BTreeMap<K, u64>, total: u64, key: &K| -> f64 {
        if total == 0 {
            0.0
        } else {
            counts.get(key).copied().unwrap_or(0) as f64 / total as f64
        }
    };

    current
        .keys()
        .chain(previous.keys())
        .map(|key| {
            (frequency(current, current_total, key) - frequency(previous, previous_total, key)).abs()
        })
        .fold(0.0, f64::max)
}

/// Distance between two categorical value distributions.
///
/// Frequencies are relative to each side's present count, so values dropped by
/// the tracking limit still weigh on the denominator.
pub fn categorical_distance(
    current: &ValueCounts,
    current_present: u64,
    previous: &ValueCounts,
    previous_present: u64,
) -> f64 {
    linf_distance(
        &current.counts,
        current_present,
        &previous.counts,
        previous_present,
    )
}

/// Distance between two numeric histograms.
///
/// Histograms built at different resolutions are compared at the coarser one,
/// so both sides always share bucket edges.
pub fn histogram_distance(current: &NumericHistogram, previous: &NumericHistogram) -> f64 {
    let resolution = current.resolution.min(previous.resolution);
    linf_distance(
        &current.counts_at(resolution),
        current.total_count(),
        &previous.counts_at(resolution),
        previous.total_count(),
    )
}

/// Drift between two snapshots of a column declared with `feature_type`.
///
/// Returns `None` when either side observed a different type, since the
/// distributions are then not comparable. A side with no present values is an
/// empty distribution.
pub fn column_distance(
    feature_type: FeatureType,
    current: &ColumnStatistics,
    previous: &ColumnStatistics,
) -> Option<f64> {
    let comparable = |column: &ColumnStatistics| {
        column.feature_type.map_or(true, |observed| observed == feature_type)
    };
    if !comparable(current) || !comparable(previous) {
        return None;
    }

    let distance = match feature_type {
        FeatureType::Numeric => match (histogram(current), histogram(previous)) {
            (Some(a), Some(b)) => histogram_distance(a, b),
            (Some(a), None) => {
                linf_distance(&a.counts_at(a.resolution), a.total_count(), &BTreeMap::new(), 0)
            }
            (None, Some(b)) => {
                linf_distance(&BTreeMap::new(), 0, &b.counts_at(b.resolution), b.total_count())
            }
            (None, None) => 0.0,
        },
        FeatureType::String | FeatureType::Boolean => {
            let empty = ValueCounts::default();
            categorical_distance(
                current.value_counts.as_ref().unwrap_or(&empty),
                current.present_count,
                previous.value_counts.as_ref().unwrap_or(&empty),
                previous.present_count,
            )
        }
    };
    Some(distance)
}

fn histogram(column: &ColumnStatistics) -> Option<&NumericHistogram> {
    column.numeric.as_ref().map(|numeric| &numeric.histogram)
}
