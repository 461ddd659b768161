//! JSON file storage implementation
//!
//! One file per collection inside a data directory. Every save rewrites the
//! whole file through a temporary sibling that is renamed into place, so a
//! crash mid-write leaves the previous contents readable.

use crate::storage::schema::{decode_document, encode_document};
use crate::storage::traits::{Document, DocumentStorage, StorageError, StorageResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// JSON file storage backend
#[derive(Debug, Clone)]
pub struct JsonStorage {
    path: PathBuf,
}

impl JsonStorage {
    /// Creates a storage for `file_name` inside `directory`, creating the
    /// directory if it does not exist
    pub fn new(directory: impl AsRef<Path>, file_name: &str) -> StorageResult<Self> {
        let directory = directory.as_ref();
        if !directory.exists() {
            std::fs::create_dir_all(directory)?;
            tracing::info!("Created directory: {}", directory.display());
        }

        let path = directory.join(file_name);
        tracing::info!("Initialized JsonStorage with file: {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl DocumentStorage for JsonStorage {
    async fn load(&self) -> StorageResult<Document> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No file available at {}, starting empty", self.path.display());
                return Ok(Document::new());
            }
            Err(e) => return Err(StorageError::Io(e)),
        };

        tracing::debug!("Loading data from {}", self.path.display());
        decode_document(&bytes, &self.describe())
    }

    async fn save(&self, document: &Document) -> StorageResult<()> {
        let bytes = encode_document(document)?;
        let tmp = self.temp_path();

        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        tracing::info!(
            "Saved {} records to {}",
            document.len(),
            self.path.display()
        );
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
