//! Error types for the schema-guard library.
//!
//! All fallible operations return [`GuardError`] through the [`Result`] alias.
//! Data-quality problems found during validation are *not* errors: they are
//! reported as [`Anomaly`](crate::validation::Anomaly) values.

use thiserror::Error;

/// The main error type for schema-guard.
#[derive(Error, Debug)]
pub enum GuardError {
    /// A column changed its observed type within a single statistics pass.
    #[error("Schema mismatch for column '{column}' at row {row}: expected {expected}, found {found}")]
    SchemaMismatch {
        /// Column whose type conflicted
        column: String,
        /// Type fixed by the first non-null observation
        expected: String,
        /// Type of the conflicting value
        found: String,
        /// Zero-based row index of the conflicting value within the pass
        row: u64,
    },

    /// A schema mutation was ill-typed or out of range.
    #[error("Invalid constraint on '{column}': {message}")]
    InvalidConstraint {
        /// Column the mutation targeted
        column: String,
        /// Why the constraint was rejected
        message: String,
    },

    /// A mutation or lookup referenced a column the schema does not declare.
    #[error("Column '{column}' not found in schema")]
    UnknownColumn { column: String },

    /// Error from DataFusion operations.
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from data source operations.
    #[error("Data source error: {message}")]
    DataSource {
        /// Type of data source (e.g., "CSV", "Query", "Arrow")
        source_type: String,
        /// Detailed error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Error from a snapshot or schema repository.
    #[error("Repository error ({operation}): {message}")]
    Repository { operation: String, message: String },

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error related to configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error when an operation is not supported.
    #[error("Operation not supported: {0}")]
    NotSupported(String),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, GuardError>`.
pub type Result<T> = std::result::Result<T, GuardError>;

impl GuardError {
    /// Creates a schema mismatch error.
    pub fn schema_mismatch(
        column: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
        row: u64,
    ) -> Self {
        Self::SchemaMismatch {
            column: column.into(),
            expected: expected.into(),
            found: found.into(),
            row,
        }
    }

    /// Creates an invalid constraint error.
    pub fn invalid_constraint(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConstraint {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Creates an unknown column error.
    pub fn unknown_column(column: impl Into<String>) -> Self {
        Self::UnknownColumn {
            column: column.into(),
        }
    }

    /// Creates a new data source error with a source error.
    pub fn data_source_with_source(
        source_type: impl Into<String>,
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::DataSource {
            source_type: source_type.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Creates a repository error.
    pub fn repository(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Repository {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for GuardError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<GuardError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| match e.into() {
            GuardError::Internal(inner) => GuardError::Internal(format!("{msg}: {inner}")),
            other => GuardError::Internal(format!("{msg}: {other}")),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let msg = f();
            match e.into() {
                GuardError::Internal(inner) => GuardError::Internal(format!("{msg}: {inner}")),
                other => GuardError::Internal(format!("{msg}: {other}")),
            }
        })
    }
}
