//! In-memory [`ArtifactRepository`] for tests and short-lived pipelines.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::instrument;

use super::{ArtifactRepository, RepositoryMetadata, ResultKey};
use crate::error::{GuardError, Result};
use crate::schema::Schema;
use crate::statistics::StatisticsSnapshot;

/// Keeps snapshots and schemas in process memory.
///
/// Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    snapshots: Arc<RwLock<HashMap<ResultKey, StatisticsSnapshot>>>,
    schemas: Arc<RwLock<HashMap<ResultKey, Schema>>>,
    last_modified: Arc<RwLock<Option<chrono::DateTime<chrono::Utc>>>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored snapshots.
    pub async fn snapshot_count(&self) -> usize {
        self.snapshots.read().await.len()
    }

    /// Drops every stored artifact.
    pub async fn clear(&self) {
        self.snapshots.write().await.clear();
        self.schemas.write().await.clear();
        self.touch().await;
    }

    async fn touch(&self) {
        *self.last_modified.write().await = Some(chrono::Utc::now());
    }
}

fn sorted_keys<V>(store: &HashMap<ResultKey, V>) -> Vec<ResultKey> {
    let mut keys: Vec<ResultKey> = store.keys().cloned().collect();
    keys.sort();
    keys
}

#[async_trait]
impl ArtifactRepository for InMemoryRepository {
    #[instrument(skip(self, snapshot), fields(key.timestamp = %key.timestamp, repository_type = "in_memory"))]
    async fn save_snapshot(&self, key: ResultKey, snapshot: &StatisticsSnapshot) -> Result<()> {
        key.validate()?;
        self.snapshots.write().await.insert(key, snapshot.clone());
        self.touch().await;
        Ok(())
    }

    #[instrument(skip(self), fields(key.timestamp = %key.timestamp, repository_type = "in_memory"))]
    async fn load_snapshot(&self, key: &ResultKey) -> Result<Option<StatisticsSnapshot>> {
        Ok(self.snapshots.read().await.get(key).cloned())
    }

    #[instrument(skip(self), fields(key.timestamp = %key.timestamp, repository_type = "in_memory"))]
    async fn delete_snapshot(&self, key: &ResultKey) -> Result<()> {
        if self.snapshots.write().await.remove(key).is_none() {
            return Err(GuardError::repository(
                "delete_snapshot",
                format!("key not found: {key}"),
            ));
        }
        self.touch().await;
        Ok(())
    }

    async fn list_snapshot_keys(&self) -> Result<Vec<ResultKey>> {
        Ok(sorted_keys(&*self.snapshots.read().await))
    }

    #[instrument(skip(self, schema), fields(key.timestamp = %key.timestamp, repository_type = "in_memory"))]
    async fn save_schema(&self, key: ResultKey, schema: &Schema) -> Result<()> {
        key.validate()?;
        self.schemas.write().await.insert(key, schema.clone());
        self.touch().await;
        Ok(())
    }

    #[instrument(skip(self), fields(key.timestamp = %key.timestamp, repository_type = "in_memory"))]
    async fn load_schema(&self, key: &ResultKey) -> Result<Option<Schema>> {
        Ok(self.schemas.read().await.get(key).cloned())
    }

    async fn list_schema_keys(&self) -> Result<Vec<ResultKey>> {
        Ok(sorted_keys(&*self.schemas.read().await))
    }

    async fn metadata(&self) -> Result<RepositoryMetadata> {
        let mut metadata = RepositoryMetadata::new("in_memory").with_counts(
            self.snapshots.read().await.len(),
            self.schemas.read().await.len(),
        );
        metadata.last_modified = *self.last_modified.read().await;
        Ok(metadata)
    }
}
