//! Storage module for persisting keyed collections
//!
//! This module handles whole-document persistence for the repositories:
//! - JSON files, one per collection, in a versioned envelope
//! - SQLite, all collections in one table, one transaction per save
//! - Backend selection from configuration

mod json;
mod schema;
mod sqlite;
mod traits;

pub use json::JsonStorage;
pub use schema::SCHEMA_VERSION;
pub use sqlite::SqliteStorage;
pub use traits::{Document, DocumentStorage, StorageError, StorageResult};

use crate::config::{StorageBackend, StorageConfig};
use std::sync::Arc;

/// Collection name used for products in shared backends
pub const PRODUCTS_COLLECTION: &str = "products";

/// Collection name used for subscriptions in shared backends
pub const SUBSCRIPTIONS_COLLECTION: &str = "subscriptions";

/// The pair of storages backing the product and subscription repositories
pub struct StoragePair {
    pub products: Arc<dyn DocumentStorage>,
    pub subscriptions: Arc<dyn DocumentStorage>,
}

/// Opens the configured backend for both collections
pub fn open_storages(config: &StorageConfig) -> StorageResult<StoragePair> {
    match config.backend {
        StorageBackend::Json => Ok(StoragePair {
            products: Arc::new(JsonStorage::new(&config.data_dir, &config.products_file)?),
            subscriptions: Arc::new(JsonStorage::new(
                &config.data_dir,
                &config.subscriptions_file,
            )?),
        }),
        StorageBackend::Sqlite => {
            let products =
                SqliteStorage::open(&config.resolved_database_path(), PRODUCTS_COLLECTION)?;
            let subscriptions = products.with_collection(SUBSCRIPTIONS_COLLECTION);
            Ok(StoragePair {
                products: Arc::new(products),
                subscriptions: Arc::new(subscriptions),
            })
        }
    }
}
