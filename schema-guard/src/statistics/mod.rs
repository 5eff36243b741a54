//! Per-column summary statistics.
//!
//! [`StatisticsComputer`] turns a sequence of [`Record`](crate::core::Record)s
//! into an immutable [`StatisticsSnapshot`] in one pass:
//!
//! - every column: present count, missing count, missing fraction
//! - numeric columns: min, max, mean, standard deviation and a log-scale
//!   histogram whose bucket edges do not depend on the data
//! - string and boolean columns: distinct values with frequencies, bounded by
//!   a tracking limit
//!
//! The per-column state behind a pass ([`PartialStatistics`]) is mergeable,
//! which is what [`StatisticsComputer::compute_partitioned`] relies on.

mod accumulator;
mod computer;
mod float_repr;
pub mod histogram;
mod types;

pub use accumulator::{AccumulatorLimits, ColumnAccumulator, MergeableState, PartialStatistics};
pub use computer::{StatisticsComputer, StatisticsComputerBuilder, StatisticsConfig};
pub use histogram::{HistogramBucket, NumericHistogram};
pub use types::{ColumnStatistics, NumericStatistics, StatisticsSnapshot, ValueCounts};
