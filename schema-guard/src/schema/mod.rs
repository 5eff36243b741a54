//! The declarative contract snapshots are validated against.
//!
//! - [`Schema`] / [`FeatureSpec`] / [`Domain`]: the contract itself
//! - [`SchemaInferencer`]: derives a schema from a statistics snapshot
//! - [`SchemaEditor`]: checked, idempotent, in-place mutations
//! - JSON export/import on [`Schema`] (`to_json`, `from_json`, `save_to_path`,
//!   `load_from_path`)

mod editor;
mod inference;
mod io;
mod types;

pub use editor::SchemaEditor;
pub use inference::{InferenceConfig, SchemaInferencer, SchemaInferencerBuilder};
pub use types::{Domain, FeatureSpec, Schema, SCHEMA_FORMAT_VERSION};
