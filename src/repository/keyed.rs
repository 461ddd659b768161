use crate::model::Identified;
use crate::repository::RecordStore;
use crate::storage::{Document, DocumentStorage, StorageError, StorageResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A collection of identified records persisted as one document
///
/// Every write is a load-mutate-save round trip held under `write_lock`, so
/// concurrent merges through the same instance cannot lose each other's
/// inserts.
pub struct KeyedRepository<T> {
    storage: Arc<dyn DocumentStorage>,
    write_lock: Mutex<()>,
    _record: PhantomData<fn() -> T>,
}

impl<T> KeyedRepository<T>
where
    T: Identified + Serialize + DeserializeOwned,
{
    pub fn new(storage: Arc<dyn DocumentStorage>) -> Self {
        Self {
            storage,
            write_lock: Mutex::new(()),
            _record: PhantomData,
        }
    }

    pub fn storage(&self) -> &Arc<dyn DocumentStorage> {
        &self.storage
    }

    /// Inserts every record whose identity is not stored yet
    ///
    /// Existing entries are never overwritten (first write wins). The
    /// document is saved exactly once, after all records are processed.
    /// Returns the number of newly inserted records.
    pub async fn merge(&self, items: Vec<T>) -> StorageResult<usize> {
        let _guard = self.write_lock.lock().await;

        let mut existing = self.storage.load().await?;
        tracing::info!(
            "Loaded {} existing records from {}",
            existing.len(),
            self.storage.describe()
        );

        let inserted = merge_into(&mut existing, items)?;
        self.storage.save(&existing).await?;
        Ok(inserted)
    }

    /// Returns every stored record
    pub async fn all(&self) -> StorageResult<Vec<T>> {
        let document = self.storage.load().await?;
        tracing::info!(
            "Retrieved {} records from {}",
            document.len(),
            self.storage.describe()
        );
        document
            .iter()
            .map(|(key, value)| self.decode(key, value))
            .collect()
    }

    /// Fetches one record by its computed identity
    pub async fn get(&self, id: &str) -> StorageResult<Option<T>> {
        let document = self.storage.load().await?;
        document
            .get(id)
            .map(|value| self.decode(id, value))
            .transpose()
    }

    pub async fn count(&self) -> StorageResult<usize> {
        Ok(self.storage.load().await?.len())
    }

    /// Removes every record for which `keep` returns false
    ///
    /// Writes once, and only when something was removed. Returns the number
    /// of removed records.
    pub async fn retain<F>(&self, mut keep: F) -> StorageResult<usize>
    where
        F: FnMut(&T) -> bool + Send,
    {
        let _guard = self.write_lock.lock().await;

        let mut document = self.storage.load().await?;
        let mut doomed = Vec::new();
        for (key, value) in &document {
            if !keep(&self.decode(key, value)?) {
                doomed.push(key.clone());
            }
        }

        if doomed.is_empty() {
            return Ok(0);
        }

        for key in &doomed {
            document.remove(key);
        }
        self.storage.save(&document).await?;
        Ok(doomed.len())
    }

    /// Applies `edit` to every record and re-keys the ones it changed
    ///
    /// `edit` returns true when it modified the record. Changed records are
    /// stored under their recomputed identity; one that lands on an identity
    /// already present is dropped, so the stored entry wins. Writes once, and
    /// only when something changed. Returns the number of changed records.
    pub async fn rewrite<F>(&self, mut edit: F) -> StorageResult<usize>
    where
        F: FnMut(&mut T) -> bool + Send,
    {
        let _guard = self.write_lock.lock().await;

        let document = self.storage.load().await?;
        let mut kept = Document::new();
        let mut changed = Vec::new();
        for (key, value) in document {
            let mut record = self.decode(&key, &value)?;
            if edit(&mut record) {
                changed.push(record);
            } else {
                kept.insert(key, value);
            }
        }

        if changed.is_empty() {
            return Ok(0);
        }

        let count = changed.len();
        let rekeyed = merge_into(&mut kept, changed)?;
        if rekeyed < count {
            tracing::debug!(
                "{} rewritten records collapsed into existing identities",
                count - rekeyed
            );
        }
        self.storage.save(&kept).await?;
        Ok(count)
    }

    fn decode(&self, key: &str, value: &serde_json::Value) -> StorageResult<T> {
        serde_json::from_value(value.clone()).map_err(|e| StorageError::Corrupt {
            location: format!("{} [{}]", self.storage.describe(), key),
            message: e.to_string(),
        })
    }
}

/// Adds records with unseen identities to `existing`, returning how many
fn merge_into<T>(existing: &mut Document, items: Vec<T>) -> StorageResult<usize>
where
    T: Identified + Serialize,
{
    let mut inserted = 0;
    for mut item in items {
        let id = item.compute_identity();
        if existing.contains_key(&id) {
            tracing::debug!("Record with id: {} already exists", id);
            continue;
        }

        item.assign_identity(id.clone());
        existing.insert(id.clone(), serde_json::to_value(&item)?);
        tracing::debug!("Added new record with id: {}", id);
        inserted += 1;
    }
    Ok(inserted)
}

#[async_trait]
impl<T> RecordStore<T> for KeyedRepository<T>
where
    T: Identified + Serialize + DeserializeOwned + Send + 'static,
{
    async fn merge(&self, records: Vec<T>) -> StorageResult<usize> {
        KeyedRepository::merge(self, records).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Product;
    use crate::storage::{JsonStorage, SqliteStorage};
    use tempfile::TempDir;

    fn product(title: &str, price: f64, image: &str) -> Product {
        Product::new(title, price, "USD", &format!("https://cdn.example.com/{}.png", image))
            .unwrap()
    }

    fn repository() -> KeyedRepository<Product> {
        KeyedRepository::new(Arc::new(SqliteStorage::open_in_memory("products").unwrap()))
    }

    #[tokio::test]
    async fn test_merge_counts_distinct_identities() {
        let repo = repository();
        let items = vec![
            product("a", 1.0, "a1"),
            product("b", 2.0, "b1"),
            product("a", 1.0, "a2"),
            product("c", 3.0, "c1"),
            product("b", 2.0, "b2"),
        ];

        assert_eq!(repo.merge(items).await.unwrap(), 3);
        assert_eq!(repo.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_first_write_wins() {
        let repo = repository();
        repo.merge(vec![product("a", 1.0, "first")]).await.unwrap();

        let inserted = repo.merge(vec![product("a", 1.0, "second")]).await.unwrap();
        assert_eq!(inserted, 0);

        let stored = repo.get("a#1.0").await.unwrap().unwrap();
        assert_eq!(stored.image_url, "https://cdn.example.com/first.png");
        assert_eq!(stored.id.as_deref(), Some("a#1.0"));
    }

    #[tokio::test]
    async fn test_price_change_creates_new_identity() {
        let repo = repository();
        repo.merge(vec![product("a", 1.0, "a")]).await.unwrap();

        assert_eq!(repo.merge(vec![product("a", 1.5, "a")]).await.unwrap(), 1);
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_merge_empty_is_not_an_error() {
        let repo = repository();
        assert_eq!(repo.merge(Vec::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let repo = repository();
        assert!(repo.get("nope#0.0").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_retain_removes_and_reports() {
        let repo = repository();
        repo.merge(vec![product("a", 1.0, "a"), product("b", 2.0, "b")])
            .await
            .unwrap();

        assert_eq!(repo.retain(|p| p.title != "a").await.unwrap(), 1);
        assert_eq!(repo.retain(|p| p.title != "a").await.unwrap(), 0);

        let remaining = repo.all().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].title, "b");
    }

    #[tokio::test]
    async fn test_rewrite_rekeys_and_keeps_existing_identity() {
        let repo = repository();
        repo.merge(vec![
            product("a", 1.0, "a"),
            product("b", 2.0, "b"),
            product("c", 3.0, "c"),
        ])
        .await
        .unwrap();

        // "a" moves to a fresh identity, "b" collides with the stored "c"
        let changed = repo
            .rewrite(|p| {
                if p.title == "a" {
                    p.price = 1.5;
                } else if p.title == "b" {
                    p.title = "c".to_string();
                    p.price = 3.0;
                } else {
                    return false;
                }
                true
            })
            .await
            .unwrap();

        assert_eq!(changed, 2);
        assert_eq!(repo.count().await.unwrap(), 2);
        assert!(repo.get("a#1.0").await.unwrap().is_none());
        assert_eq!(
            repo.get("a#1.5").await.unwrap().unwrap().id.as_deref(),
            Some("a#1.5")
        );
        let c = repo.get("c#3.0").await.unwrap().unwrap();
        assert_eq!(c.image_url, "https://cdn.example.com/c.png");
    }

    #[tokio::test]
    async fn test_rewrite_without_changes_does_not_save() {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(JsonStorage::new(dir.path(), "products.json").unwrap());
        let repo = KeyedRepository::<Product>::new(storage.clone());

        assert_eq!(repo.rewrite(|_| false).await.unwrap(), 0);
        assert!(!storage.path().exists());
    }

    #[tokio::test]
    async fn test_concurrent_merges_do_not_lose_updates() {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(JsonStorage::new(dir.path(), "products.json").unwrap());
        let repo = Arc::new(KeyedRepository::<Product>::new(storage));

        let mut handles = Vec::new();
        for batch in 0..8 {
            let repo = Arc::clone(&repo);
            handles.push(tokio::spawn(async move {
                let items = (0..5)
                    .map(|i| product(&format!("item-{}-{}", batch, i), 1.0, "x"))
                    .collect();
                repo.merge(items).await.unwrap()
            }));
        }

        let mut total = 0;
        for handle in handles {
            total += handle.await.unwrap();
        }

        assert_eq!(total, 40);
        assert_eq!(repo.count().await.unwrap(), 40);
    }
}
