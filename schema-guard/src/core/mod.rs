//! Core data model shared by every stage of the pipeline.
//!
//! - [`Value`]: a single cell; `Null` and `NaN` count as missing
//! - [`Record`]: one row, an ordered mapping from column name to value
//! - [`FeatureType`]: the observed or declared type of a column
//! - [`Severity`]: the severity attached to anomalies

mod level;
mod record;
mod value;

pub use level::Severity;
pub use record::Record;
pub use value::{FeatureType, Value};
