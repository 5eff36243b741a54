//! [`ArtifactRepository`] backed by JSON files on the local filesystem.
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/snapshots/<storage key>.json
//! <root>/schemas/<storage key>.json
//! ```
//!
//! Every file stores its [`ResultKey`] next to the artifact, so listing keys
//! never depends on parsing file names. Writes go to a temporary file that is
//! renamed into place.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{instrument, warn};

use super::{ArtifactRepository, RepositoryMetadata, ResultKey};
use crate::error::{GuardError, Result};
use crate::log_data_op;
use crate::logging::{truncate_field, LogConfig};
use crate::schema::Schema;
use crate::statistics::StatisticsSnapshot;

const SNAPSHOT_DIR: &str = "snapshots";
const SCHEMA_DIR: &str = "schemas";

#[derive(Serialize)]
struct StoredRef<'a, T> {
    key: &'a ResultKey,
    artifact: &'a T,
}

#[derive(Deserialize)]
struct Stored<T> {
    key: ResultKey,
    artifact: T,
}

#[derive(Deserialize)]
struct StoredKey {
    key: ResultKey,
}

/// Stores snapshots and schemas as JSON documents under a root directory.
#[derive(Debug, Clone)]
pub struct FileSystemRepository {
    root: PathBuf,
    log_config: LogConfig,
}

impl FileSystemRepository {
    /// Uses `root` as the storage directory; it is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            log_config: LogConfig::default(),
        }
    }

    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, dir: &str, key: &ResultKey) -> PathBuf {
        self.root
            .join(dir)
            .join(format!("{}.json", key.to_storage_key()))
    }

    async fn write<T: Serialize + Sync>(&self, dir: &str, key: &ResultKey, artifact: &T) -> Result<()> {
        key.validate()?;
        let path = self.path_for(dir, key);
        fs::create_dir_all(self.root.join(dir)).await?;

        let json = serde_json::to_string_pretty(&StoredRef { key, artifact })?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &path).await?;
        log_data_op!(
            self.log_config,
            operation = "write",
            path = %self.display_path(&path),
            "Stored artifact"
        );
        Ok(())
    }

    async fn read<T: DeserializeOwned>(&self, dir: &str, key: &ResultKey) -> Result<Option<T>> {
        let path = self.path_for(dir, key);
        let json = match fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let stored: Stored<T> = serde_json::from_str(&json)?;
        if stored.key != *key {
            return Err(GuardError::repository(
                "read",
                format!("{} holds {} instead of {key}", path.display(), stored.key),
            ));
        }
        log_data_op!(
            self.log_config,
            operation = "read",
            path = %self.display_path(&path),
            bytes = json.len(),
            "Loaded artifact"
        );
        Ok(Some(stored.artifact))
    }

    fn display_path(&self, path: &Path) -> String {
        truncate_field(&path.display().to_string(), self.log_config.max_field_length)
    }

    async fn list(&self, dir: &str) -> Result<Vec<ResultKey>> {
        let mut entries = match fs::read_dir(self.root.join(dir)).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let json = fs::read_to_string(&path).await?;
            match serde_json::from_str::<StoredKey>(&json) {
                Ok(stored) => keys.push(stored.key),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable artifact"),
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[async_trait]
impl ArtifactRepository for FileSystemRepository {
    #[instrument(skip(self, snapshot), fields(key.timestamp = %key.timestamp, repository_type = "filesystem"))]
    async fn save_snapshot(&self, key: ResultKey, snapshot: &StatisticsSnapshot) -> Result<()> {
        self.write(SNAPSHOT_DIR, &key, snapshot).await
    }

    #[instrument(skip(self), fields(key.timestamp = %key.timestamp, repository_type = "filesystem"))]
    async fn load_snapshot(&self, key: &ResultKey) -> Result<Option<StatisticsSnapshot>> {
        self.read(SNAPSHOT_DIR, key).await
    }

    #[instrument(skip(self), fields(key.timestamp = %key.timestamp, repository_type = "filesystem"))]
    async fn delete_snapshot(&self, key: &ResultKey) -> Result<()> {
        match fs::remove_file(self.path_for(SNAPSHOT_DIR, key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(GuardError::repository(
                "delete_snapshot",
                format!("key not found: {key}"),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_snapshot_keys(&self) -> Result<Vec<ResultKey>> {
        self.list(SNAPSHOT_DIR).await
    }

    #[instrument(skip(self, schema), fields(key.timestamp = %key.timestamp, repository_type = "filesystem"))]
    async fn save_schema(&self, key: ResultKey, schema: &Schema) -> Result<()> {
        self.write(SCHEMA_DIR, &key, schema).await
    }

    #[instrument(skip(self), fields(key.timestamp = %key.timestamp, repository_type = "filesystem"))]
    async fn load_schema(&self, key: &ResultKey) -> Result<Option<Schema>> {
        self.read(SCHEMA_DIR, key).await
    }

    async fn list_schema_keys(&self) -> Result<Vec<ResultKey>> {
        self.list(SCHEMA_DIR).await
    }

    async fn metadata(&self) -> Result<RepositoryMetadata> {
        let snapshots = self.list_snapshot_keys().await?.len();
        let schemas = self.list_schema_keys().await?.len();
        Ok(RepositoryMetadata::new("filesystem")
            .with_counts(snapshots, schemas)
            .with_config("root", self.root.display().to_string()))
    }
}
