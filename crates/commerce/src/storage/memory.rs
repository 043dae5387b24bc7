//! In-memory storage backend for tests and ephemeral sessions.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{StorageBackend, StorageError, validate_key};

/// A `HashMap`-backed [`StorageBackend`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<String, serde_json::Value>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for MemoryStore {
    async fn load(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError> {
        validate_key(key)?;
        Ok(self.documents.read().await.get(key).cloned())
    }

    async fn save(&self, key: &str, value: &serde_json::Value) -> Result<(), StorageError> {
        validate_key(key)?;
        self.documents
            .write()
            .await
            .insert(key.to_owned(), value.clone());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        self.documents.write().await.remove(key);
        Ok(())
    }
}
