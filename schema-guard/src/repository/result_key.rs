//! Keys identifying stored snapshots and schemas.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{GuardError, Result};

const MAX_TAG_COUNT: usize = 32;
const MAX_TAG_KEY_LENGTH: usize = 64;
const MAX_TAG_VALUE_LENGTH: usize = 256;
/// Longest readable storage key; longer ones are hashed. Leaves room for a
/// file extension under the common 255-byte file name limit.
const MAX_READABLE_STORAGE_KEY: usize = 200;

/// Identifies one stored artifact: a timestamp plus free-form tags.
///
/// Tags describe what the artifact belongs to (dataset, environment,
/// pipeline run) and are what [`latest_snapshot`] filters on.
///
/// [`latest_snapshot`]: super::ArtifactRepository::latest_snapshot
///
/// # Example
///
/// ```rust
/// use schema_guard::repository::ResultKey;
///
/// let key = ResultKey::now()
///     .with_tag("dataset", "taxi_trips")
///     .with_tag("environment", "SERVING");
/// assert_eq!(key.get_tag("dataset"), Some("taxi_trips"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResultKey {
    /// Unix timestamp in milliseconds.
    pub timestamp: i64,
    /// Tags, kept sorted by key.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl ResultKey {
    pub fn new(timestamp: i64) -> Self {
        Self {
            timestamp,
            tags: BTreeMap::new(),
        }
    }

    /// Creates a key stamped with the current time.
    pub fn now() -> Self {
        Self::new(chrono::Utc::now().timestamp_millis())
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_tags<I, K, V>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in tags {
            self.tags.insert(k.into(), v.into());
        }
        self
    }

    /// Returns the timestamp as a chrono DateTime.
    pub fn as_datetime(&self) -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::from_timestamp_millis(self.timestamp).unwrap_or_default()
    }

    pub fn has_tag(&self, key: &str) -> bool {
        self.tags.contains_key(key)
    }

    pub fn get_tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Returns `true` if every given tag exists on this key with the same value.
    pub fn matches_tags(&self, tags: &BTreeMap<String, String>) -> bool {
        tags.iter().all(|(k, v)| self.tags.get(k) == Some(v))
    }

    /// Rejects keys whose tags cannot be stored safely.
    pub fn validate(&self) -> Result<()> {
        if self.tags.len() > MAX_TAG_COUNT {
            return Err(GuardError::repository(
                "validate_key",
                format!("too many tags: {} (max: {MAX_TAG_COUNT})", self.tags.len()),
            ));
        }
        for (key, value) in &self.tags {
            if key.is_empty() {
                return Err(GuardError::repository(
                    "validate_key",
                    "tag key cannot be empty",
                ));
            }
            if key.len() > MAX_TAG_KEY_LENGTH || value.len() > MAX_TAG_VALUE_LENGTH {
                return Err(GuardError::repository(
                    "validate_key",
                    format!("tag '{key}' exceeds the length limit"),
                ));
            }
            if key.chars().chain(value.chars()).any(char::is_control) {
                return Err(GuardError::repository(
                    "validate_key",
                    format!("tag '{key}' contains control characters"),
                ));
            }
        }
        Ok(())
    }

    /// A file-name safe rendering of the key.
    ///
    /// Short keys stay readable: the timestamp followed by each tag as
    /// `_key=value`, with bytes outside `[A-Za-z0-9.-]` percent-encoded. When
    /// that would exceed 200 bytes the tags are replaced by
    /// `_sha_<SHA-256 of the tags in hex>`, so the result is at most 90 bytes.
    /// The two forms cannot collide because a readable tag segment always
    /// holds a `=`.
    pub fn to_storage_key(&self) -> String {
        let mut out = self.timestamp.to_string();
        for (key, value) in &self.tags {
            out.push('_');
            percent_encode(key, &mut out);
            out.push('=');
            percent_encode(value, &mut out);
        }
        if out.len() <= MAX_READABLE_STORAGE_KEY {
            return out;
        }

        let mut hasher = Sha256::new();
        for (key, value) in &self.tags {
            hasher.update((key.len() as u64).to_le_bytes());
            hasher.update(key.as_bytes());
            hasher.update((value.len() as u64).to_le_bytes());
            hasher.update(value.as_bytes());
        }
        format!("{}_sha_{}", self.timestamp, hex::encode(hasher.finalize()))
    }
}

fn percent_encode(text: &str, out: &mut String) {
    for byte in text.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'.' || byte == b'-' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
}

impl fmt::Display for ResultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResultKey(timestamp={}", self.timestamp)?;
        if !self.tags.is_empty() {
            let tags: Vec<String> = self.tags.iter().map(|(k, v)| format!("{k}={v}")).collect();
            write!(f, ", tags={{{}}}", tags.join(", "))?;
        }
        write!(f, ")")
    }
}
