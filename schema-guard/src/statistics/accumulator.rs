//! Mergeable per-column accumulators.
//!
//! Every aggregate kept here (counts, moments, min/max, histogram buckets and
//! value frequencies) can be merged, so partitions of a dataset can be
//! accumulated independently and combined afterwards. Counts, extremes and
//! buckets merge exactly; mean and deviation agree up to rounding.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::histogram::{bucket_index, NumericHistogram};
use super::types::{ColumnStatistics, NumericStatistics, StatisticsSnapshot, ValueCounts};
use crate::core::{FeatureType, Record, Value};
use crate::error::{GuardError, Result};

/// State that can be computed per partition and merged.
pub trait MergeableState: Sized {
    /// Merges states computed from disjoint partitions, in partition order.
    fn merge(states: Vec<Self>) -> Result<Self>;
}

/// Limits applied while accumulating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccumulatorLimits {
    /// Maximum distinct values tracked per categorical column.
    pub max_tracked_values: usize,
    /// Histogram sub-buckets per power of two (a power of two).
    pub histogram_resolution: u32,
}

/// Numeric moments. Mean and squared deviations use Welford's update (Chan's
/// formula when merging) over finite values only; infinities are counted
/// apart so a single one cannot turn the mean into NaN.
#[derive(Debug, Clone, Default)]
struct NumericState {
    finite: u64,
    mean: f64,
    m2: f64,
    positive_infinities: u64,
    negative_infinities: u64,
    min: Option<f64>,
    max: Option<f64>,
    buckets: BTreeMap<i64, u64>,
}

/// Weighted mean of two means, falling back to a form whose intermediate
/// values stay in range when the means are far apart.
fn combine_means(mean_a: f64, weight_a: f64, mean_b: f64, weight_b: f64) -> f64 {
    let total = weight_a + weight_b;
    let shifted = mean_a + (mean_b - mean_a) * weight_b / total;
    if shifted.is_finite() {
        shifted
    } else {
        mean_a * (weight_a / total) + mean_b * (weight_b / total)
    }
}

impl NumericState {
    fn observe(&mut self, value: f64, resolution: u32) {
        if value == f64::INFINITY {
            self.positive_infinities += 1;
        } else if value == f64::NEG_INFINITY {
            self.negative_infinities += 1;
        } else {
            let previous = self.finite as f64;
            self.finite += 1;
            let delta = value - self.mean;
            self.mean = combine_means(self.mean, previous, value, 1.0);
            self.m2 += delta * (value - self.mean);
        }
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
        *self.buckets.entry(bucket_index(value, resolution)).or_insert(0) += 1;
    }

    fn absorb(&mut self, other: NumericState) {
        if other.finite > 0 {
            let (na, nb) = (self.finite as f64, other.finite as f64);
            let delta = other.mean - self.mean;
            self.m2 += other.m2 + delta * delta * (na * nb / (na + nb));
            self.mean = combine_means(self.mean, na, other.mean, nb);
            self.finite += other.finite;
        }
        self.positive_infinities += other.positive_infinities;
        self.negative_infinities += other.negative_infinities;
        self.min = match (self.min, other.min) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.max = match (self.max, other.max) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        for (index, count) in other.buckets {
            *self.buckets.entry(index).or_insert(0) += count;
        }
    }

    fn finish(&self, resolution: u32) -> Option<NumericStatistics> {
        let (min, max) = (self.min?, self.max?);
        let infinite = self.positive_infinities > 0 || self.negative_infinities > 0;
        let mean = match (self.positive_infinities > 0, self.negative_infinities > 0) {
            (true, true) => f64::NAN,
            (true, false) => f64::INFINITY,
            (false, true) => f64::NEG_INFINITY,
            (false, false) => self.mean,
        };
        let std_dev = if infinite {
            f64::INFINITY
        } else {
            (self.m2 / self.finite as f64).max(0.0).sqrt()
        };
        Some(NumericStatistics {
            min,
            max,
            mean,
            std_dev,
            histogram: NumericHistogram::from_counts(resolution, &self.buckets),
        })
    }
}

/// Running aggregates for a single column.
#[derive(Debug, Clone)]
pub struct ColumnAccumulator {
    name: String,
    feature_type: Option<FeatureType>,
    /// Global row index of the observation that fixed `feature_type`.
    typed_at_row: Option<u64>,
    present: u64,
    numeric: NumericState,
    values: BTreeMap<String, u64>,
    truncated: bool,
}

impl ColumnAccumulator {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            feature_type: None,
            typed_at_row: None,
            present: 0,
            numeric: NumericState::default(),
            values: BTreeMap::new(),
            truncated: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn feature_type(&self) -> Option<FeatureType> {
        self.feature_type
    }

    fn observe(&mut self, value: &Value, row: u64, limits: &AccumulatorLimits) -> Result<()> {
        let Some(observed) = value.feature_type() else {
            return Ok(());
        };
        match self.feature_type {
            None => {
                self.feature_type = Some(observed);
                self.typed_at_row = Some(row);
            }
            Some(expected) if expected != observed => {
                return Err(GuardError::schema_mismatch(
                    &self.name,
                    expected.as_str(),
                    observed.as_str(),
                    row,
                ));
            }
            Some(_) => {}
        }

        self.present += 1;
        if let Some(number) = value.as_f64() {
            self.numeric.observe(number, limits.histogram_resolution);
        } else if let Some(key) = value.categorical_key() {
            self.count_value(key, 1, limits.max_tracked_values);
        }
        Ok(())
    }

    fn count_value(&mut self, key: String, count: u64, max_tracked: usize) {
        if let Some(existing) = self.values.get_mut(&key) {
            *existing += count;
        } else if self.values.len() < max_tracked {
            self.values.insert(key, count);
        } else {
            self.truncated = true;
        }
    }

    /// The type conflict a later partition's column introduces, keyed by the
    /// global row of its first typed value.
    fn conflict_with(&self, other: &ColumnAccumulator) -> Option<(u64, GuardError)> {
        match (self.feature_type, other.feature_type) {
            (Some(expected), Some(found)) if expected != found => {
                let row = other.typed_at_row.unwrap_or_default();
                Some((
                    row,
                    GuardError::schema_mismatch(&self.name, expected.as_str(), found.as_str(), row),
                ))
            }
            _ => None,
        }
    }

    /// Folds a later partition's column in; the types must already agree.
    fn absorb(&mut self, other: ColumnAccumulator, limits: &AccumulatorLimits) {
        if self.feature_type.is_none() {
            self.feature_type = other.feature_type;
            self.typed_at_row = other.typed_at_row;
        }

        self.present += other.present;
        self.numeric.absorb(other.numeric);
        self.truncated |= other.truncated;
        for (key, count) in other.values {
            self.count_value(key, count, limits.max_tracked_values);
        }
    }

    fn finish(&self, row_count: u64, limits: &AccumulatorLimits) -> ColumnStatistics {
        let missing_count = row_count.saturating_sub(self.present);
        let missing_fraction = if row_count == 0 {
            0.0
        } else {
            missing_count as f64 / row_count as f64
        };
        let (numeric, value_counts) = match self.feature_type {
            Some(FeatureType::Numeric) => (
                self.numeric.finish(limits.histogram_resolution),
                None,
            ),
            Some(FeatureType::String) | Some(FeatureType::Boolean) => (
                None,
                Some(ValueCounts {
                    counts: self.values.clone(),
                    truncated: self.truncated,
                }),
            ),
            None => (None, None),
        };
        ColumnStatistics {
            name: self.name.clone(),
            feature_type: self.feature_type,
            present_count: self.present,
            missing_count,
            missing_fraction,
            numeric,
            value_counts,
        }
    }
}

/// Accumulated state for one partition (or the whole) of a dataset pass.
///
/// Missing counts are derived at the end as `row_count - present`, so a
/// column that only shows up part-way through the pass is still charged with
/// the rows that lacked it.
#[derive(Debug, Clone)]
pub struct PartialStatistics {
    limits: AccumulatorLimits,
    row_offset: u64,
    row_count: u64,
    columns: Vec<ColumnAccumulator>,
    index: HashMap<String, usize>,
}

impl PartialStatistics {
    /// Creates an empty partition whose first row has global index `row_offset`.
    pub fn new(limits: AccumulatorLimits, row_offset: u64) -> Self {
        Self {
            limits,
            row_offset,
            row_count: 0,
            columns: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    pub fn columns(&self) -> &[ColumnAccumulator] {
        &self.columns
    }

    /// Accumulates one record.
    pub fn add_record(&mut self, record: &Record) -> Result<()> {
        let row = self.row_offset + self.row_count;
        for (name, value) in record.iter() {
            let position = self.position_of(name);
            self.columns[position].observe(value, row, &self.limits)?;
        }
        self.row_count += 1;
        Ok(())
    }

    fn position_of(&mut self, name: &str) -> usize {
        if self.index.len() != self.columns.len() {
            self.rebuild_index();
        }
        if let Some(&position) = self.index.get(name) {
            return position;
        }
        self.columns.push(ColumnAccumulator::new(name));
        let position = self.columns.len() - 1;
        self.index.insert(name.to_string(), position);
        position
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();
    }

    /// Folds a later partition into this one.
    ///
    /// When the partition's columns disagree with the types fixed so far, the
    /// conflict with the lowest global row is reported, as a sequential pass
    /// would, and nothing is merged.
    pub fn absorb(&mut self, other: PartialStatistics) -> Result<()> {
        if self.limits != other.limits {
            return Err(GuardError::Configuration(
                "cannot merge partitions accumulated with different limits".to_string(),
            ));
        }
        if let Some(error) = self.first_conflict(&other) {
            return Err(error);
        }
        self.row_count += other.row_count;
        for column in other.columns {
            let position = self.position_of(&column.name);
            self.columns[position].absorb(column, &self.limits);
        }
        Ok(())
    }

    fn first_conflict(&mut self, other: &PartialStatistics) -> Option<GuardError> {
        if self.index.len() != self.columns.len() {
            self.rebuild_index();
        }
        other
            .columns
            .iter()
            .filter_map(|column| {
                let position = *self.index.get(&column.name)?;
                self.columns[position].conflict_with(column)
            })
            .min_by_key(|(row, _)| *row)
            .map(|(_, error)| error)
    }

    /// Finalizes the accumulated state into an immutable snapshot.
    pub fn finish(&self) -> Result<StatisticsSnapshot> {
        let columns = self
            .columns
            .iter()
            .map(|c| c.finish(self.row_count, &self.limits))
            .collect();
        StatisticsSnapshot::new(self.row_count, columns)
    }
}

impl MergeableState for PartialStatistics {
    fn merge(states: Vec<Self>) -> Result<Self> {
        let mut states = states.into_iter();
        let mut merged = states
            .next()
            .ok_or_else(|| GuardError::Internal("no partitions to merge".to_string()))?;
        for state in states {
            merged.absorb(state)?;
        }
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> AccumulatorLimits {
        AccumulatorLimits {
            max_tracked_values: 3,
            histogram_resolution: 4,
        }
    }

    #[test]
    fn test_late_column_counts_earlier_rows_as_missing() {
        let mut partial = PartialStatistics::new(limits(), 0);
        partial.add_record(&Record::new().with("a", 1)).unwrap();
        partial
            .add_record(&Record::new().with("a", 2).with("b", "x"))
            .unwrap();

        let snapshot = partial.finish().unwrap();
        let b = snapshot.column("b").unwrap();
        assert_eq!(b.present_count, 1);
        assert_eq!(b.missing_count, 1);
        assert_eq!(b.missing_fraction, 0.5);
    }

    #[test]
    fn test_type_conflict_reports_row() {
        let mut partial = PartialStatistics::new(limits(), 10);
        partial.add_record(&Record::new().with("a", 1)).unwrap();
        let err = partial
            .add_record(&Record::new().with("a", "one"))
            .unwrap_err();
        match err {
            GuardError::SchemaMismatch {
                column,
                expected,
                found,
                row,
            } => {
                assert_eq!(column, "a");
                assert_eq!(expected, "numeric");
                assert_eq!(found, "string");
                assert_eq!(row, 11);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_tracking_limit_truncates() {
        let mut partial = PartialStatistics::new(limits(), 0);
        for value in ["a", "b", "c", "d", "a"] {
            partial.add_record(&Record::new().with("v", value)).unwrap();
        }
        let snapshot = partial.finish().unwrap();
        let counts = snapshot.column("v").unwrap().value_counts.clone().unwrap();
        assert!(counts.truncated);
        assert_eq!(counts.distinct_count(), 3);
        assert_eq!(counts.counts["a"], 2);
    }

    #[test]
    fn test_merge_combines_partitions() {
        let mut first = PartialStatistics::new(limits(), 0);
        first.add_record(&Record::new().with("n", 1.0)).unwrap();
        let mut second = PartialStatistics::new(limits(), 1);
        second
            .add_record(&Record::new().with("n", 5.0).with("s", true))
            .unwrap();

        let merged = PartialStatistics::merge(vec![first, second]).unwrap();
        let snapshot = merged.finish().unwrap();
        assert_eq!(snapshot.row_count(), 2);

        let n = snapshot.column("n").unwrap().numeric.clone().unwrap();
        assert_eq!(n.min, 1.0);
        assert_eq!(n.max, 5.0);
        assert_eq!(n.mean, 3.0);
        assert_eq!(n.std_dev, 2.0);

        let s = snapshot.column("s").unwrap();
        assert_eq!(s.feature_type, Some(FeatureType::Boolean));
        assert_eq!(s.missing_count, 1);
    }

    #[test]
    fn test_merge_detects_cross_partition_conflict() {
        let mut first = PartialStatistics::new(limits(), 0);
        first.add_record(&Record::new().with("x", 1)).unwrap();
        let mut second = PartialStatistics::new(limits(), 1);
        second.add_record(&Record::new().with("x", "1")).unwrap();

        let err = PartialStatistics::merge(vec![first, second]).unwrap_err();
        assert!(matches!(err, GuardError::SchemaMismatch { row: 1, .. }));
    }

    #[test]
    fn test_all_null_column_has_no_type() {
        let mut partial = PartialStatistics::new(limits(), 0);
        partial.add_record(&Record::new().with("z", Value::Null)).unwrap();
        let snapshot = partial.finish().unwrap();
        let z = snapshot.column("z").unwrap();
        assert_eq!(z.feature_type, None);
        assert_eq!(z.missing_count, 1);
        assert!(z.numeric.is_none() && z.value_counts.is_none());
    }

    fn numeric(values: &[f64]) -> NumericStatistics {
        let mut partial = PartialStatistics::new(limits(), 0);
        for &value in values {
            partial.add_record(&Record::new().with("x", value)).unwrap();
        }
        partial.finish().unwrap().column("x").unwrap().numeric.clone().unwrap()
    }

    #[test]
    fn test_infinities_do_not_poison_the_mean() {
        let n = numeric(&[f64::INFINITY, 1.0]);
        assert_eq!(n.mean, f64::INFINITY);
        assert_eq!(n.std_dev, f64::INFINITY);
        assert_eq!(n.min, 1.0);
        assert_eq!(n.max, f64::INFINITY);

        assert_eq!(numeric(&[f64::NEG_INFINITY, 4.0]).mean, f64::NEG_INFINITY);
        assert!(numeric(&[f64::INFINITY, f64::NEG_INFINITY]).mean.is_nan());
    }

    #[test]
    fn test_huge_values_keep_a_finite_mean() {
        assert_eq!(numeric(&[f64::MAX, -f64::MAX]).mean, 0.0);
        assert_eq!(numeric(&[f64::MAX, f64::MAX]).mean, f64::MAX);
    }

    #[test]
    fn test_moments_match_textbook_values() {
        let n = numeric(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((n.mean - 5.0).abs() < 1e-12);
        assert!((n.std_dev - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_merge_reports_earliest_conflict() {
        let mut first = PartialStatistics::new(limits(), 0);
        first
            .add_record(&Record::new().with("a", 1).with("b", 1))
            .unwrap();

        // "a" is typed at row 6, "b" at row 5
        let mut second = PartialStatistics::new(limits(), 5);
        second
            .add_record(&Record::new().with("a", Value::Null).with("b", "five"))
            .unwrap();
        second.add_record(&Record::new().with("a", "six")).unwrap();

        let err = PartialStatistics::merge(vec![first, second]).unwrap_err();
        match err {
            GuardError::SchemaMismatch { column, row, .. } => {
                assert_eq!(column, "b");
                assert_eq!(row, 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
