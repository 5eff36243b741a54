//! Where records come from.
//!
//! The statistics pass consumes plain [`Record`]s. This module adapts the
//! usual producers to that shape: in-memory records, Arrow record batches,
//! CSV files and SQL queries run through DataFusion.
//!
//! # Examples
//!
//! ```rust,no_run
//! use schema_guard::sources::{CsvSource, RecordSource};
//! use schema_guard::statistics::StatisticsComputer;
//!
//! # async fn example() -> schema_guard::error::Result<()> {
//! let source = CsvSource::new("data/training.csv")?;
//! let snapshot = StatisticsComputer::new().compute_source(&source).await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use std::fmt::Debug;

use crate::core::Record;
use crate::error::Result;

mod convert;
mod csv;
mod memory;
mod query;

pub use convert::batch_to_records;
pub use csv::{CsvOptions, CsvSource};
pub use memory::MemorySource;
pub use query::QuerySource;

/// A producer of records for a statistics pass.
#[async_trait]
pub trait RecordSource: Debug + Send + Sync {
    /// Loads every record, in source order.
    async fn records(&self) -> Result<Vec<Record>>;

    /// Returns a human-readable description of this source.
    fn description(&self) -> String;
}
