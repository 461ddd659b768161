//! Storage traits and error types
//!
//! This module defines the trait interface for document storage backends and
//! associated error types.

use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;

/// A whole keyed collection: computed identity -> full record as JSON
pub type Document = BTreeMap<String, serde_json::Value>;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Corrupt document at {location}: {message}")]
    Corrupt { location: String, message: String },

    #[error("Unsupported schema version {found} at {location} (this build reads up to {supported})")]
    UnsupportedVersion {
        location: String,
        found: u32,
        supported: u32,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Storage task failed: {0}")]
    Task(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for document storage strategies
///
/// A backend stores exactly one [`Document`] and always reads and writes it
/// as a whole. Callers that need read-modify-write consistency must
/// serialize access themselves; the repositories do so per instance.
#[async_trait]
pub trait DocumentStorage: Send + Sync {
    /// Loads the full document; a backend with nothing stored yet returns an
    /// empty document
    async fn load(&self) -> StorageResult<Document>;

    /// Replaces the stored document with `document`
    async fn save(&self, document: &Document) -> StorageResult<()>;

    /// Human-readable location, used in log lines
    fn describe(&self) -> String;
}
