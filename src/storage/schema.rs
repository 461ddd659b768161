//! Persisted layout definitions
//!
//! JSON collections are wrapped in a versioned envelope; the SQLite backend
//! keeps every collection in one `documents` table next to a `schema_meta`
//! row carrying the same version number.

use crate::storage::traits::{Document, StorageError, StorageResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

/// Version written by this build
pub const SCHEMA_VERSION: u32 = 1;

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (collection, key)
);

CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection);
"#;

/// Creates the tables if needed and checks the stored schema version
pub fn initialize_schema(conn: &Connection, location: &str) -> StorageResult<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (id, version) VALUES (1, ?1)",
        params![SCHEMA_VERSION],
    )?;

    let found: u32 = conn.query_row("SELECT version FROM schema_meta WHERE id = 1", [], |row| {
        row.get(0)
    })?;
    check_version(found, location)
}

fn check_version(found: u32, location: &str) -> StorageResult<()> {
    if found > SCHEMA_VERSION {
        return Err(StorageError::UnsupportedVersion {
            location: location.to_string(),
            found,
            supported: SCHEMA_VERSION,
        });
    }
    Ok(())
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    schema_version: u32,
    updated_at: DateTime<Utc>,
    entries: &'a Document,
}

#[derive(Deserialize)]
struct Envelope {
    schema_version: u32,
    entries: Document,
}

/// Serializes a document inside the current envelope
pub fn encode_document(document: &Document) -> StorageResult<Vec<u8>> {
    let envelope = EnvelopeRef {
        schema_version: SCHEMA_VERSION,
        updated_at: Utc::now(),
        entries: document,
    };
    Ok(serde_json::to_vec_pretty(&envelope)?)
}

/// Decodes either a versioned envelope or a bare legacy map
///
/// An empty input decodes to an empty document.
pub fn decode_document(bytes: &[u8], location: &str) -> StorageResult<Document> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Document::new());
    }

    let corrupt = |message: String| StorageError::Corrupt {
        location: location.to_string(),
        message,
    };

    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| corrupt(e.to_string()))?;

    let serde_json::Value::Object(map) = value else {
        return Err(corrupt("top-level value is not an object".to_string()));
    };

    if map.contains_key("schema_version") && map.contains_key("entries") {
        let envelope: Envelope = serde_json::from_value(serde_json::Value::Object(map))
            .map_err(|e| corrupt(e.to_string()))?;
        check_version(envelope.schema_version, location)?;
        return Ok(envelope.entries);
    }

    tracing::debug!("Reading unversioned document at {}", location);
    Ok(map.into_iter().collect())
}
