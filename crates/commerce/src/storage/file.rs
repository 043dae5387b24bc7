//! File-backed storage: one JSON document per key.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::instrument;

use super::{StorageBackend, StorageError, validate_key};

/// Stores each key as `<root>/<key>.json`.
///
/// Writes go to a temporary file first and are renamed into place, so a
/// crash mid-write leaves the previous document intact rather than a
/// truncated one.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    /// Create a store rooted at `root`. The directory is created lazily on
    /// first save.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory documents are stored under.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

#[async_trait]
impl StorageBackend for JsonFileStore {
    #[instrument(skip(self))]
    async fn load(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError> {
        validate_key(key)?;
        let path = self.path_for(key);

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::Io(e)),
        };

        let value = serde_json::from_slice(&bytes)?;
        Ok(Some(value))
    }

    #[instrument(skip(self, value))]
    async fn save(&self, key: &str, value: &serde_json::Value) -> Result<(), StorageError> {
        validate_key(key)?;
        tokio::fs::create_dir_all(&self.root).await?;

        let bytes = serde_json::to_vec_pretty(value)?;
        let tmp = self.root.join(format!(".{key}.json.tmp"));
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, self.path_for(key)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}
