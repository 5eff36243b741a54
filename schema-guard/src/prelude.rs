//! Prelude for commonly used types and traits in schema-guard.

pub use crate::core::{FeatureType, Record, Severity, Value};
pub use crate::error::{ErrorContext, GuardError, Result};
pub use crate::formatters::{FormatterConfig, ReportFormatter};
pub use crate::logging::LogConfig;
pub use crate::repository::{ArtifactRepository, ResultKey};
pub use crate::schema::{Domain, FeatureSpec, Schema, SchemaEditor, SchemaInferencer};
pub use crate::sources::RecordSource;
pub use crate::statistics::{MergeableState, StatisticsComputer, StatisticsSnapshot};
pub use crate::validation::{Anomaly, AnomalyKind, ValidationReport, Validator};
