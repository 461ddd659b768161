//! Repositories over document storage
//!
//! A repository owns one keyed collection: it computes identities, performs
//! the deduplicating merge and answers queries. The storage strategy below it
//! only ever sees whole documents.

mod keyed;
mod subscriptions;

pub use keyed::KeyedRepository;
pub use subscriptions::SubscriptionRepository;

use crate::model::Product;
use crate::storage::StorageResult;
use async_trait::async_trait;

/// Persisted products, keyed by `title#price`
pub type ProductRepository = KeyedRepository<Product>;

/// Deduplicating persistence consumed by the scrape orchestrator
#[async_trait]
pub trait RecordStore<R>: Send + Sync {
    /// Merges `records` by computed identity and returns how many were new
    async fn merge(&self, records: Vec<R>) -> StorageResult<usize>;
}
