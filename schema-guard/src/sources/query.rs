//! SQL query results from a DataFusion session.

use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use datafusion::prelude::SessionContext;
use tracing::instrument;

use super::{batch_to_records, RecordSource};
use crate::core::Record;
use crate::error::{GuardError, Result};
use crate::log_data_op;
use crate::logging::{truncate_field, LogConfig};

/// The result of a SQL query as a [`RecordSource`].
///
/// The session is shared with the caller, so any table registered on it
/// (CSV, Parquet, in-memory tables, custom providers) can be queried.
///
/// # Examples
///
/// ```rust,no_run
/// use datafusion::prelude::{CsvReadOptions, SessionContext};
/// use schema_guard::sources::{QuerySource, RecordSource};
///
/// # async fn example() -> schema_guard::error::Result<()> {
/// let ctx = SessionContext::new();
/// ctx.register_csv("events", "data/events.csv", CsvReadOptions::new()).await?;
///
/// let source = QuerySource::new(ctx, "SELECT country, age FROM events WHERE age > 18")?;
/// let records = source.records().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct QuerySource {
    ctx: SessionContext,
    sql: String,
    log_config: LogConfig,
}

impl std::fmt::Debug for QuerySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuerySource")
            .field("sql", &self.sql)
            .finish_non_exhaustive()
    }
}

impl QuerySource {
    pub fn new(ctx: SessionContext, sql: impl Into<String>) -> Result<Self> {
        let sql = sql.into();
        if sql.trim().is_empty() {
            return Err(GuardError::Configuration(
                "query must not be empty".to_string(),
            ));
        }
        Ok(Self {
            ctx,
            sql,
            log_config: LogConfig::default(),
        })
    }

    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Runs the query and collects its result.
    #[instrument(skip(self), fields(sql = %truncate_field(&self.sql, self.log_config.max_field_length)))]
    pub async fn batches(&self) -> Result<Vec<RecordBatch>> {
        let frame = self.ctx.sql(&self.sql).await?;
        let batches = frame.collect().await?;
        log_data_op!(
            self.log_config,
            source = "query",
            sql = %truncate_field(&self.sql, self.log_config.max_field_length),
            batches = batches.len(),
            rows = batches.iter().map(RecordBatch::num_rows).sum::<usize>(),
            "Collected query result"
        );
        Ok(batches)
    }
}

#[async_trait]
impl RecordSource for QuerySource {
    async fn records(&self) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        for batch in self.batches().await? {
            records.extend(batch_to_records(&batch)?);
        }
        Ok(records)
    }

    fn description(&self) -> String {
        format!("query {}", self.sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;
    use arrow::array::{Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use datafusion::datasource::MemTable;
    use std::sync::Arc;

    fn context() -> SessionContext {
        let schema = Arc::new(Schema::new(vec![
            Field::new("country", DataType::Utf8, true),
            Field::new("age", DataType::Int64, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec![Some("GB"), Some("FR"), None])),
                Arc::new(Int64Array::from(vec![Some(40), Some(12), Some(25)])),
            ],
        )
        .unwrap();
        let table = MemTable::try_new(schema, vec![vec![batch]]).unwrap();
        let ctx = SessionContext::new();
        ctx.register_table("people", Arc::new(table)).unwrap();
        ctx
    }

    #[tokio::test]
    async fn test_query_records() {
        let source =
            QuerySource::new(context(), "SELECT country, age FROM people WHERE age > 18 ORDER BY age")
                .unwrap();
        let records = source.records().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("country"), Some(&Value::Null));
        assert_eq!(records[1].get("age"), Some(&Value::Integer(40)));
    }

    #[tokio::test]
    async fn test_bad_query() {
        let source = QuerySource::new(context(), "SELECT nope FROM people").unwrap();
        assert!(matches!(
            source.records().await,
            Err(GuardError::DataFusion(_))
        ));
        assert!(QuerySource::new(context(), "  ").is_err());
    }

    #[tokio::test]
    async fn test_long_query_with_data_logging() {
        let log_config = LogConfig {
            max_field_length: 16,
            ..LogConfig::verbose()
        };
        let sql = format!(
            "SELECT country FROM people WHERE country IN ({})",
            (0..50).map(|i| format!("'C{i}'")).collect::<Vec<_>>().join(", ")
        );
        let source = QuerySource::new(context(), sql)
            .unwrap()
            .with_log_config(log_config);
        assert!(source.records().await.unwrap().is_empty());
    }
}
