//! Snapshot types produced by the statistics pass.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use super::histogram::NumericHistogram;
use crate::core::FeatureType;
use crate::error::{GuardError, Result};

/// Summary statistics for a numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericStatistics {
    #[serde(with = "super::float_repr")]
    pub min: f64,
    #[serde(with = "super::float_repr")]
    pub max: f64,
    /// Infinite when an infinity was observed; NaN when both were.
    #[serde(with = "super::float_repr")]
    pub mean: f64,
    /// Population standard deviation; infinite when an infinity was observed
    /// or the spread exceeds the `f64` range.
    #[serde(with = "super::float_repr")]
    pub std_dev: f64,
    pub histogram: NumericHistogram,
}

/// Observed value frequencies for a string or boolean column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ValueCounts {
    /// Distinct values with their occurrence counts, ordered by value.
    pub counts: BTreeMap<String, u64>,
    /// Set when the distinct-value tracking limit was reached; values first
    /// seen after that point are not represented in `counts`.
    pub truncated: bool,
}

impl ValueCounts {
    pub fn distinct_count(&self) -> usize {
        self.counts.len()
    }

    pub fn contains(&self, value: &str) -> bool {
        self.counts.contains_key(value)
    }
}

/// Statistics for one column of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStatistics {
    pub name: String,
    /// `None` when every observation of the column was missing.
    pub feature_type: Option<FeatureType>,
    pub present_count: u64,
    pub missing_count: u64,
    pub missing_fraction: f64,
    /// Set for numeric columns with at least one present value.
    pub numeric: Option<NumericStatistics>,
    /// Set for string and boolean columns.
    pub value_counts: Option<ValueCounts>,
}

impl ColumnStatistics {
    /// Fraction of rows where the column is present (1.0 for an empty pass).
    pub fn present_fraction(&self) -> f64 {
        let total = self.present_count + self.missing_count;
        if total == 0 {
            1.0
        } else {
            self.present_count as f64 / total as f64
        }
    }

    /// Number of distinct tracked values, for categorical columns.
    pub fn distinct_count(&self) -> Option<usize> {
        self.value_counts.as_ref().map(ValueCounts::distinct_count)
    }
}

/// Per-column statistics for one dataset pass.
///
/// Columns keep the order in which they were first encountered. A snapshot is
/// never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    row_count: u64,
    columns: Vec<ColumnStatistics>,
}

impl StatisticsSnapshot {
    /// Assembles a snapshot, rejecting duplicate column names.
    pub fn new(row_count: u64, columns: Vec<ColumnStatistics>) -> Result<Self> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(GuardError::Internal(format!(
                    "duplicate column '{}' in statistics snapshot",
                    column.name
                )));
            }
        }
        Ok(Self { row_count, columns })
    }

    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    /// Columns in first-encountered order.
    pub fn columns(&self) -> &[ColumnStatistics] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnStatistics> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Serializes the snapshot to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses a snapshot previously produced by [`to_json`](Self::to_json).
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: StatisticsSnapshot = serde_json::from_str(json)?;
        Self::new(snapshot.row_count, snapshot.columns)
            .map_err(|e| GuardError::Serialization(e.to_string()))
    }
}
