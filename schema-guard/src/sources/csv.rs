//! CSV files read through DataFusion.

use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use datafusion::prelude::{CsvReadOptions, SessionContext};
use std::path::Path;
use tracing::instrument;

use super::{batch_to_records, RecordSource};
use crate::core::Record;
use crate::error::{GuardError, Result};
use crate::log_data_op;
use crate::logging::{truncate_field, LogConfig};

/// Options for reading a CSV file.
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Whether the file starts with a header row
    pub has_header: bool,
    /// Field delimiter (default: ',')
    pub delimiter: u8,
    /// Rows sampled to infer column types
    pub schema_infer_max_records: usize,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            has_header: true,
            delimiter: b',',
            schema_infer_max_records: 1000,
        }
    }
}

/// A CSV file as a [`RecordSource`].
///
/// Column types are inferred by DataFusion from a sample of rows; empty
/// fields become nulls.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: String,
    options: CsvOptions,
    log_config: LogConfig,
}

impl CsvSource {
    pub fn new(path: impl Into<String>) -> Result<Self> {
        Self::with_options(path, CsvOptions::default())
    }

    pub fn with_options(path: impl Into<String>, options: CsvOptions) -> Result<Self> {
        let path = path.into();
        if path.trim().is_empty() {
            return Err(GuardError::Configuration(
                "CSV source path must not be empty".to_string(),
            ));
        }
        Ok(Self {
            path,
            options,
            log_config: LogConfig::default(),
        })
    }

    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Reads the whole file as Arrow batches.
    #[instrument(skip(self), fields(path = %truncate_field(&self.path, self.log_config.max_field_length)))]
    pub async fn batches(&self) -> Result<Vec<RecordBatch>> {
        // DataFusion filters by extension, so match whatever the file uses.
        let extension = Path::new(&self.path)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let read_options = CsvReadOptions::new()
            .has_header(self.options.has_header)
            .delimiter(self.options.delimiter)
            .schema_infer_max_records(self.options.schema_infer_max_records)
            .file_extension(&extension);

        let ctx = SessionContext::new();
        let frame = ctx
            .read_csv(self.path.as_str(), read_options)
            .await
            .map_err(|e| {
                GuardError::data_source_with_source(
                    "csv",
                    format!("failed to open {}", self.path),
                    Box::new(e),
                )
            })?;
        let batches = frame.collect().await?;
        log_data_op!(
            self.log_config,
            source = "csv",
            path = %truncate_field(&self.path, self.log_config.max_field_length),
            batches = batches.len(),
            rows = batches.iter().map(RecordBatch::num_rows).sum::<usize>(),
            "Read CSV file"
        );
        Ok(batches)
    }
}

#[async_trait]
impl RecordSource for CsvSource {
    async fn records(&self) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        for batch in self.batches().await? {
            records.extend(batch_to_records(&batch)?);
        }
        Ok(records)
    }

    fn description(&self) -> String {
        format!("csv file {}", self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;
    use std::io::Write;

    #[test]
    fn test_rejects_empty_path() {
        assert!(matches!(
            CsvSource::new(" "),
            Err(GuardError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_reads_records() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "country,age").unwrap();
        writeln!(file, "GB,31").unwrap();
        writeln!(file, "FR,").unwrap();
        file.flush().unwrap();

        let source = CsvSource::new(file.path().to_string_lossy()).unwrap();
        let records = source.records().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("country"), Some(&Value::String("GB".into())));
        assert_eq!(records[0].get("age"), Some(&Value::Integer(31)));
        assert_eq!(records[1].get("age"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn test_tab_separated() {
        let mut file = tempfile::Builder::new().suffix(".tsv").tempfile().unwrap();
        writeln!(file, "a\tb").unwrap();
        writeln!(file, "x\ttrue").unwrap();
        file.flush().unwrap();

        let options = CsvOptions {
            delimiter: b'\t',
            ..Default::default()
        };
        let source = CsvSource::with_options(file.path().to_string_lossy(), options).unwrap();
        let records = source.records().await.unwrap();
        assert_eq!(records[0].get("b"), Some(&Value::Boolean(true)));
    }

    #[tokio::test]
    async fn test_quiet_log_config() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "n").unwrap();
        writeln!(file, "1").unwrap();
        file.flush().unwrap();

        let source = CsvSource::new(file.path().to_string_lossy())
            .unwrap()
            .with_log_config(LogConfig::production());
        assert_eq!(source.records().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let source = CsvSource::new("/definitely/not/here.csv").unwrap();
        assert!(source.records().await.is_err());
    }
}
