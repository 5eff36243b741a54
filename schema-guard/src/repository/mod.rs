//! Persistence for statistics snapshots and schemas.
//!
//! A typical pipeline stores the snapshot of every run and the schema it was
//! validated against, then fetches the most recent snapshot for the same
//! dataset as the `previous` side of the next drift check. Backends implement
//! [`ArtifactRepository`]; [`InMemoryRepository`] and
//! [`FileSystemRepository`] are provided.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::error::{GuardError, Result};
use crate::schema::Schema;
use crate::statistics::StatisticsSnapshot;

mod filesystem;
mod in_memory;
mod result_key;

pub use filesystem::FileSystemRepository;
pub use in_memory::InMemoryRepository;
pub use result_key::ResultKey;

/// Storage backend for snapshots and schemas.
///
/// Saving under an existing key replaces the stored artifact. Loading an
/// unknown key is not an error and yields `None`.
///
/// # Example
///
/// ```rust
/// use schema_guard::core::Record;
/// use schema_guard::repository::{ArtifactRepository, InMemoryRepository, ResultKey};
/// use schema_guard::statistics::StatisticsComputer;
/// use std::collections::BTreeMap;
///
/// # async fn example() -> schema_guard::error::Result<()> {
/// let repository = InMemoryRepository::new();
/// let snapshot = StatisticsComputer::new().compute(&[Record::new().with("a", 1)])?;
///
/// repository
///     .save_snapshot(ResultKey::now().with_tag("dataset", "users"), &snapshot)
///     .await?;
///
/// let mut filter = BTreeMap::new();
/// filter.insert("dataset".to_string(), "users".to_string());
/// let (_, previous) = repository.latest_snapshot(&filter).await?.unwrap();
/// assert_eq!(previous, snapshot);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait ArtifactRepository: Send + Sync {
    /// Stores a snapshot under `key`.
    async fn save_snapshot(&self, key: ResultKey, snapshot: &StatisticsSnapshot) -> Result<()>;

    /// Loads the snapshot stored under `key`.
    async fn load_snapshot(&self, key: &ResultKey) -> Result<Option<StatisticsSnapshot>>;

    /// Deletes the snapshot stored under `key`; unknown keys are an error.
    async fn delete_snapshot(&self, key: &ResultKey) -> Result<()>;

    /// Lists snapshot keys, oldest first.
    async fn list_snapshot_keys(&self) -> Result<Vec<ResultKey>>;

    /// Stores a schema under `key`.
    async fn save_schema(&self, key: ResultKey, schema: &Schema) -> Result<()>;

    /// Loads the schema stored under `key`.
    async fn load_schema(&self, key: &ResultKey) -> Result<Option<Schema>>;

    /// Lists schema keys, oldest first.
    async fn list_schema_keys(&self) -> Result<Vec<ResultKey>>;

    /// Returns the newest snapshot whose key carries all of `tags`.
    async fn latest_snapshot(
        &self,
        tags: &BTreeMap<String, String>,
    ) -> Result<Option<(ResultKey, StatisticsSnapshot)>> {
        let Some(key) = latest_matching(self.list_snapshot_keys().await?, tags) else {
            return Ok(None);
        };
        let snapshot = self.load_snapshot(&key).await?.ok_or_else(|| {
            GuardError::repository("latest_snapshot", format!("{key} vanished while loading"))
        })?;
        Ok(Some((key, snapshot)))
    }

    /// Returns the newest schema whose key carries all of `tags`.
    async fn latest_schema(
        &self,
        tags: &BTreeMap<String, String>,
    ) -> Result<Option<(ResultKey, Schema)>> {
        let Some(key) = latest_matching(self.list_schema_keys().await?, tags) else {
            return Ok(None);
        };
        let schema = self.load_schema(&key).await?.ok_or_else(|| {
            GuardError::repository("latest_schema", format!("{key} vanished while loading"))
        })?;
        Ok(Some((key, schema)))
    }

    /// Returns metadata about the repository.
    async fn metadata(&self) -> Result<RepositoryMetadata> {
        Ok(RepositoryMetadata::default())
    }
}

/// Picks the newest key carrying `tags`; ties on the timestamp go to the
/// greater key so the choice is deterministic.
fn latest_matching(keys: Vec<ResultKey>, tags: &BTreeMap<String, String>) -> Option<ResultKey> {
    keys.into_iter().filter(|k| k.matches_tags(tags)).max()
}

/// Metadata about a repository.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RepositoryMetadata {
    /// The type of repository backend (e.g., "filesystem", "in_memory").
    pub backend_type: Option<String>,
    pub snapshot_count: Option<usize>,
    pub schema_count: Option<usize>,
    /// Backend-specific configuration.
    pub config: HashMap<String, String>,
    pub last_modified: Option<chrono::DateTime<chrono::Utc>>,
}

impl RepositoryMetadata {
    pub fn new(backend_type: impl Into<String>) -> Self {
        Self {
            backend_type: Some(backend_type.into()),
            ..Default::default()
        }
    }

    pub fn with_counts(mut self, snapshots: usize, schemas: usize) -> Self {
        self.snapshot_count = Some(snapshots);
        self.schema_count = Some(schemas);
        self
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_matching() {
        let keys = vec![
            ResultKey::new(3).with_tag("env", "dev"),
            ResultKey::new(1).with_tag("env", "prod"),
            ResultKey::new(2).with_tag("env", "prod"),
        ];
        let mut tags = BTreeMap::new();
        assert_eq!(latest_matching(keys.clone(), &tags).unwrap().timestamp, 3);

        tags.insert("env".to_string(), "prod".to_string());
        assert_eq!(latest_matching(keys.clone(), &tags).unwrap().timestamp, 2);

        tags.insert("env".to_string(), "test".to_string());
        assert!(latest_matching(keys, &tags).is_none());
    }

    #[test]
    fn test_metadata_builder() {
        let metadata = RepositoryMetadata::new("filesystem")
            .with_counts(3, 1)
            .with_config("root", "/var/schema-guard");
        assert_eq!(metadata.backend_type.as_deref(), Some("filesystem"));
        assert_eq!(metadata.snapshot_count, Some(3));
        assert_eq!(metadata.schema_count, Some(1));
        assert_eq!(
            metadata.config.get("root").map(String::as_str),
            Some("/var/schema-guard")
        );
    }
}
