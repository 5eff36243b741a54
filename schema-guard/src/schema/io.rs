//! Schema export and import.
//!
//! Schemas are stored as versioned JSON documents. Import re-checks every
//! schema invariant, so a hand-edited document that breaks one is rejected
//! instead of producing a schema the editor could never have built.

use std::fs;
use std::path::Path;
use tracing::{debug, instrument};

use super::types::Schema;
use crate::error::Result;

impl Schema {
    /// Exports the schema as pretty-printed JSON.
    ///
    /// ```rust
    /// use schema_guard::core::FeatureType;
    /// use schema_guard::schema::{FeatureSpec, Schema};
    ///
    /// let mut schema = Schema::new();
    /// schema.edit().add_feature(FeatureSpec::new("age", FeatureType::Numeric))?;
    ///
    /// let json = schema.to_json()?;
    /// assert_eq!(Schema::from_json(&json)?, schema);
    /// # Ok::<(), schema_guard::error::GuardError>(())
    /// ```
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Imports a schema exported by [`to_json`](Self::to_json).
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Writes the schema document to `path`.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = self.to_json()?;
        fs::write(path.as_ref(), json)?;
        debug!(features = self.len(), "Saved schema");
        Ok(())
    }

    /// Reads a schema document from `path`.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }
}
