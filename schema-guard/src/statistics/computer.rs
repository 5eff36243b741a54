//! The statistics pass: records in, [`StatisticsSnapshot`] out.

use arrow::record_batch::RecordBatch;
use futures::future::try_join_all;
use std::time::Instant;
use tracing::{debug, info, instrument};

use super::accumulator::{AccumulatorLimits, MergeableState, PartialStatistics};
use super::histogram::{normalize_resolution, DEFAULT_HISTOGRAM_RESOLUTION};
use super::types::StatisticsSnapshot;
use crate::core::Record;
use crate::error::{GuardError, Result};
use crate::logging::LogConfig;
use crate::sources::{batch_to_records, RecordSource};

/// Configuration for a [`StatisticsComputer`].
#[derive(Debug, Clone)]
pub struct StatisticsConfig {
    /// Maximum distinct values tracked per string/boolean column
    pub max_tracked_values: usize,
    /// Histogram sub-buckets per power of two for numeric columns
    pub histogram_resolution: u32,
    /// Number of partitions used by [`StatisticsComputer::compute_partitioned`]
    pub partitions: usize,
    /// Logging behaviour for the pass
    pub log_config: LogConfig,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            max_tracked_values: 10_000,
            histogram_resolution: DEFAULT_HISTOGRAM_RESOLUTION,
            partitions: num_cpus::get(),
            log_config: LogConfig::default(),
        }
    }
}

impl StatisticsConfig {
    fn limits(&self) -> AccumulatorLimits {
        AccumulatorLimits {
            max_tracked_values: self.max_tracked_values,
            histogram_resolution: normalize_resolution(self.histogram_resolution),
        }
    }
}

/// Builder for [`StatisticsComputer`].
#[derive(Debug, Default)]
pub struct StatisticsComputerBuilder {
    config: StatisticsConfig,
}

impl StatisticsComputerBuilder {
    /// Sets the distinct-value tracking limit for categorical columns.
    pub fn max_tracked_values(mut self, limit: usize) -> Self {
        self.config.max_tracked_values = limit;
        self
    }

    /// Sets the histogram resolution; rounded up to a power of two in `1..=64`.
    pub fn histogram_resolution(mut self, resolution: u32) -> Self {
        self.config.histogram_resolution = resolution;
        self
    }

    /// Sets the partition count for partitioned computation (at least 1).
    pub fn partitions(mut self, partitions: usize) -> Self {
        self.config.partitions = partitions.max(1);
        self
    }

    pub fn log_config(mut self, log_config: LogConfig) -> Self {
        self.config.log_config = log_config;
        self
    }

    pub fn build(self) -> StatisticsComputer {
        StatisticsComputer {
            config: self.config,
        }
    }
}

/// Computes per-column statistics in a single pass.
///
/// The type of each column is fixed by its first non-null value; any later
/// value of a different type aborts the pass with
/// [`GuardError::SchemaMismatch`].
///
/// # Examples
///
/// ```rust
/// use schema_guard::core::Record;
/// use schema_guard::statistics::StatisticsComputer;
///
/// let records = vec![
///     Record::new().with("country", "GB").with("age", 41),
///     Record::new().with("country", "FR").with("age", None::<i64>),
/// ];
///
/// let snapshot = StatisticsComputer::new().compute(&records).unwrap();
/// assert_eq!(snapshot.row_count(), 2);
/// assert_eq!(snapshot.column("age").unwrap().missing_count, 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StatisticsComputer {
    config: StatisticsConfig,
}

impl StatisticsComputer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> StatisticsComputerBuilder {
        StatisticsComputerBuilder::default()
    }

    pub fn config(&self) -> &StatisticsConfig {
        &self.config
    }

    /// Computes a snapshot from a sequence of records.
    #[instrument(skip_all)]
    pub fn compute<'a, I>(&self, records: I) -> Result<StatisticsSnapshot>
    where
        I: IntoIterator<Item = &'a Record>,
    {
        let start = Instant::now();
        let mut partial = PartialStatistics::new(self.config.limits(), 0);
        for record in records {
            partial.add_record(record)?;
        }
        let snapshot = partial.finish()?;

        if self.config.log_config.log_metrics {
            info!(
                rows = snapshot.row_count(),
                columns = snapshot.len(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Computed statistics snapshot"
            );
        }
        Ok(snapshot)
    }

    /// Computes a snapshot from Arrow record batches, in batch order.
    #[instrument(skip_all, fields(batches = batches.len()))]
    pub fn compute_batches(&self, batches: &[RecordBatch]) -> Result<StatisticsSnapshot> {
        let mut partial = PartialStatistics::new(self.config.limits(), 0);
        for batch in batches {
            for record in batch_to_records(batch)? {
                partial.add_record(&record)?;
            }
        }
        partial.finish()
    }

    /// Scatter-gather variant of [`compute`](Self::compute).
    ///
    /// Records are split into contiguous chunks, accumulated on the blocking
    /// thread pool and merged in chunk order. This reproduces the sequential
    /// result (column order, counts, extremes and histograms; mean and
    /// deviation up to rounding) and reports a type conflict at the same row
    /// a sequential pass would. When a categorical column hits the tracking
    /// limit, the retained values may differ from a sequential pass.
    #[instrument(skip_all, fields(records = records.len(), partitions = self.config.partitions))]
    pub async fn compute_partitioned(&self, records: Vec<Record>) -> Result<StatisticsSnapshot> {
        let limits = self.config.limits();
        let partitions = self.config.partitions.max(1);
        let chunk_size = ((records.len() + partitions - 1) / partitions).max(1);

        let mut chunks: Vec<Vec<Record>> = Vec::with_capacity(partitions);
        let mut remaining = records.into_iter().peekable();
        while remaining.peek().is_some() {
            chunks.push(remaining.by_ref().take(chunk_size).collect());
        }
        debug!(chunks = chunks.len(), chunk_size, "Scattering statistics pass");

        let handles = chunks.into_iter().enumerate().map(|(i, chunk)| {
            let offset = (i * chunk_size) as u64;
            tokio::task::spawn_blocking(move || {
                let mut partial = PartialStatistics::new(limits, offset);
                for record in &chunk {
                    if let Err(error) = partial.add_record(record) {
                        return (partial, Some(error));
                    }
                }
                (partial, None)
            })
        });

        let joined = try_join_all(handles)
            .await
            .map_err(|e| GuardError::Internal(format!("statistics partition panicked: {e}")))?;

        let mut partials = Vec::with_capacity(joined.len());
        for (partial, failure) in joined {
            partials.push(partial);
            if let Some(error) = failure {
                // A clash with the types fixed by earlier partitions comes
                // before anything the failed partition found on its own.
                PartialStatistics::merge(partials)?;
                return Err(error);
            }
        }

        if partials.is_empty() {
            return PartialStatistics::new(limits, 0).finish();
        }
        PartialStatistics::merge(partials)?.finish()
    }

    /// Pulls every record from `source` and runs a partitioned pass over them.
    #[instrument(skip_all, fields(source = %source.description()))]
    pub async fn compute_source(&self, source: &dyn RecordSource) -> Result<StatisticsSnapshot> {
        let records = source.records().await?;
        self.compute_partitioned(records).await
    }
}
