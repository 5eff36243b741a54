//! Records already in memory.

use arrow::record_batch::RecordBatch;
use async_trait::async_trait;

use super::{batch_to_records, RecordSource};
use crate::core::Record;
use crate::error::Result;

/// A [`RecordSource`] over records held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    records: Vec<Record>,
}

impl MemorySource {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Converts Arrow batches up front, in batch order.
    pub fn from_batches(batches: &[RecordBatch]) -> Result<Self> {
        let mut records = Vec::new();
        for batch in batches {
            records.extend(batch_to_records(batch)?);
        }
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl From<Vec<Record>> for MemorySource {
    fn from(records: Vec<Record>) -> Self {
        Self::new(records)
    }
}

#[async_trait]
impl RecordSource for MemorySource {
    async fn records(&self) -> Result<Vec<Record>> {
        Ok(self.records.clone())
    }

    fn description(&self) -> String {
        format!("in-memory ({} records)", self.records.len())
    }
}
