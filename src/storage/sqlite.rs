//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the DocumentStorage
//! trait. Several collections can share one connection; each `save` swaps a
//! collection's rows inside a single transaction.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Document, DocumentStorage, StorageError, StorageResult};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// SQLite storage backend bound to one collection
#[derive(Clone)]
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
    collection: String,
    location: String,
}

impl SqliteStorage {
    /// Opens (or creates) the database at `path` and binds to `collection`
    pub fn open(path: &Path, collection: &str) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        let location = path.display().to_string();
        initialize_schema(&conn, &location)?;
        tracing::info!("Initialized SqliteStorage at {} ({})", location, collection);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            collection: collection.to_string(),
            location,
        })
    }

    /// Creates an in-memory database (for testing)
    pub fn open_in_memory(collection: &str) -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn, ":memory:")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            collection: collection.to_string(),
            location: ":memory:".to_string(),
        })
    }

    /// Returns a storage for another collection on the same connection
    pub fn with_collection(&self, collection: &str) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
            collection: collection.to_string(),
            location: self.location.clone(),
        }
    }

    fn load_blocking(
        conn: &Mutex<Connection>,
        collection: &str,
        location: &str,
    ) -> StorageResult<Document> {
        let conn = conn
            .lock()
            .map_err(|_| StorageError::Task("connection lock poisoned".to_string()))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM documents WHERE collection = ?1 ORDER BY key")?;
        let rows = stmt.query_map(params![collection], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut document = Document::new();
        for row in rows {
            let (key, raw) = row?;
            let value = serde_json::from_str(&raw).map_err(|e| StorageError::Corrupt {
                location: format!("{}#{}/{}", location, collection, key),
                message: e.to_string(),
            })?;
            document.insert(key, value);
        }
        Ok(document)
    }

    fn save_blocking(
        conn: &Mutex<Connection>,
        collection: &str,
        document: &Document,
    ) -> StorageResult<()> {
        let mut conn = conn
            .lock()
            .map_err(|_| StorageError::Task("connection lock poisoned".to_string()))?;

        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM documents WHERE collection = ?1",
            params![collection],
        )?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO documents (collection, key, value) VALUES (?1, ?2, ?3)",
            )?;
            for (key, value) in document {
                let raw = serde_json::to_string(value)?;
                insert.execute(params![collection, key, raw])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStorage for SqliteStorage {
    async fn load(&self) -> StorageResult<Document> {
        let conn = Arc::clone(&self.conn);
        let collection = self.collection.clone();
        let location = self.location.clone();

        tokio::task::spawn_blocking(move || Self::load_blocking(&conn, &collection, &location))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))?
    }

    async fn save(&self, document: &Document) -> StorageResult<()> {
        let conn = Arc::clone(&self.conn);
        let collection = self.collection.clone();
        let document = document.clone();
        let count = document.len();

        tokio::task::spawn_blocking(move || Self::save_blocking(&conn, &collection, &document))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))??;

        tracing::info!(
            "Saved {} records to {} ({})",
            count,
            self.location,
            self.collection
        );
        Ok(())
    }

    fn describe(&self) -> String {
        format!("{} ({})", self.location, self.collection)
    }
}
