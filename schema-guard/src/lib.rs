//! # schema-guard - Schema contracts for tabular data
//!
//! schema-guard summarizes a dataset into per-column statistics, derives a
//! schema from them, and checks later datasets against that schema to catch
//! type changes, unseen categorical values, dropping completeness and
//! distribution drift or training/serving skew.
//!
//! ## Overview
//!
//! ```text
//! records -> StatisticsComputer -> StatisticsSnapshot -> SchemaInferencer -> Schema
//!                                                                              |
//!                                                                  (SchemaEditor edits)
//!                                                                              v
//!            Validator(current snapshot, schema, previous snapshot, environment) -> anomalies
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use schema_guard::prelude::*;
//!
//! let training = vec![
//!     Record::new().with("country", "GB").with("age", 34),
//!     Record::new().with("country", "FR").with("age", 51),
//! ];
//! let serving = vec![
//!     Record::new().with("country", "DE").with("age", 29),
//!     Record::new().with("country", "GB"),
//! ];
//!
//! let baseline = schema_guard::compute(&training)?;
//! let mut schema = schema_guard::infer(&baseline);
//! schema
//!     .edit()
//!     .set_presence_threshold("age", 1.0)?
//!     .set_drift_threshold("country", 0.3)?;
//!
//! let current = schema_guard::compute(&serving)?;
//! let anomalies = schema_guard::validate(&current, &schema, Some(&baseline), None);
//!
//! let kinds: Vec<AnomalyKind> = anomalies.iter().map(|a| a.kind).collect();
//! assert_eq!(
//!     kinds,
//!     vec![
//!         AnomalyKind::UnexpectedValue,
//!         AnomalyKind::DriftExceeded,
//!         AnomalyKind::PresenceBelowThreshold,
//!     ]
//! );
//! # Ok::<(), GuardError>(())
//! ```
//!
//! ## Environments
//!
//! A schema can declare environments (for example `TRAINING` and `SERVING`)
//! and mark features as expected to be absent in some of them, such as a
//! label that only exists at training time. Validating with that environment
//! suppresses the missing-column anomaly for those features.
//!
//! ## Architecture
//!
//! - **`core`**: values, records, feature types, severity
//! - **`statistics`**: the statistics pass, mergeable accumulators, histograms
//! - **`schema`**: schema model, inference, editing, JSON export/import
//! - **`validation`**: the validator, drift distances, anomaly reports
//! - **`sources`**: Arrow batches, CSV files and DataFusion queries as records
//! - **`repository`**: persistence for snapshots and schemas
//! - **`formatters`**: human, JSON and Markdown report rendering
//! - **`logging`**: `tracing` configuration helpers

pub mod core;
pub mod error;
pub mod formatters;
pub mod logging;
pub mod prelude;
pub mod repository;
pub mod schema;
pub mod sources;
pub mod statistics;
pub mod validation;

use crate::core::Record;
use crate::error::Result;
use crate::schema::{Schema, SchemaInferencer};
use crate::statistics::{StatisticsComputer, StatisticsSnapshot};
use crate::validation::{Anomaly, Validator};

/// Computes a statistics snapshot with the default configuration.
///
/// See [`StatisticsComputer`] for tracking limits and partitioned execution.
pub fn compute<'a, I>(records: I) -> Result<StatisticsSnapshot>
where
    I: IntoIterator<Item = &'a Record>,
{
    StatisticsComputer::new().compute(records)
}

/// Infers a schema with the default cardinality cap.
pub fn infer(stats: &StatisticsSnapshot) -> Schema {
    SchemaInferencer::new().infer(stats)
}

/// Validates `current` against `schema`.
///
/// `previous` enables drift checks; `environment` selects which
/// absent-in-environment markers apply, defaulting to the schema's default
/// environment.
pub fn validate(
    current: &StatisticsSnapshot,
    schema: &Schema,
    previous: Option<&StatisticsSnapshot>,
    environment: Option<&str>,
) -> Vec<Anomaly> {
    Validator::new().validate(current, schema, previous, environment)
}
