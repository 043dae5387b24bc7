//! Durable key-value persistence port.
//!
//! The commerce core persists the live cart and the order collection as
//! JSON documents behind the [`StorageBackend`] trait, so the presentation
//! layer can pick any backend (file, embedded DB, browser storage bridge)
//! without the core knowing.
//!
//! Loss or corruption of a stored document must never propagate to the
//! shopper: the stores catch load errors and fall back to empty state.

pub mod file;
pub mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when loading or saving persisted state.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying I/O failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored document could not be parsed or value could not be encoded.
    #[error("storage encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// The key contains characters the backend cannot store safely.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),
}

/// Durable key-value storage for JSON documents.
///
/// Implementations are single-writer from the perspective of one browsing
/// session; no cross-session locking is required.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Load the document stored under `key`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the document exists but cannot be read
    /// or parsed. Callers treat this as corruption and degrade to empty
    /// state.
    async fn load(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError>;

    /// Persist `value` under `key`, replacing any previous document.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the document cannot be written.
    async fn save(&self, key: &str, value: &serde_json::Value) -> Result<(), StorageError>;

    /// Delete the document stored under `key`. Absent keys are a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the delete fails.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Validate that a key is safe for path-based backends.
pub(crate) fn validate_key(key: &str) -> Result<(), StorageError> {
    let ok = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_owned()))
    }
}
