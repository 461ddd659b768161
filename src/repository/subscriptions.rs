use crate::model::{bounded_text, Subscription};
use crate::repository::KeyedRepository;
use crate::storage::{DocumentStorage, StorageResult};
use crate::HarvestError;
use std::sync::Arc;

/// Topic subscriptions, keyed by `topic#user`
pub struct SubscriptionRepository {
    inner: KeyedRepository<Subscription>,
}

impl SubscriptionRepository {
    pub fn new(storage: Arc<dyn DocumentStorage>) -> Self {
        Self {
            inner: KeyedRepository::new(storage),
        }
    }

    /// Adds one subscription; returns 1 if it was new and 0 if it existed
    pub async fn add(&self, topic: &str, user: &str) -> crate::Result<usize> {
        let subscription = Subscription::new(topic, user)?;
        Ok(self.inner.merge(vec![subscription]).await?)
    }

    /// Like [`add`](Self::add), but reports an existing pair as an error
    pub async fn subscribe(&self, topic: &str, user: &str) -> crate::Result<()> {
        match self.add(topic, user).await? {
            0 => Err(HarvestError::DuplicateSubscription {
                topic: topic.trim().to_string(),
                user: user.trim().to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Subscribes every user in `users` to `topic` in one write
    ///
    /// All users are validated before anything is stored. Returns how many
    /// subscriptions were newly added.
    pub async fn add_users_to_topic<S: AsRef<str>>(
        &self,
        topic: &str,
        users: &[S],
    ) -> crate::Result<usize> {
        let subscriptions = users
            .iter()
            .map(|user| Subscription::new(topic, user.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.inner.merge(subscriptions).await?)
    }

    /// Users currently subscribed to `topic`, read fresh from storage
    ///
    /// Lookups and removals trim their arguments the way
    /// [`Subscription::new`] does, so they match what `add` stored.
    pub async fn users_by_topic(&self, topic: &str) -> StorageResult<Vec<String>> {
        let topic = topic.trim();
        Ok(self
            .inner
            .all()
            .await?
            .into_iter()
            .filter(|s| s.topic == topic)
            .map(|s| s.user)
            .collect())
    }

    pub async fn topics_by_user(&self, user: &str) -> StorageResult<Vec<String>> {
        let user = user.trim();
        Ok(self
            .inner
            .all()
            .await?
            .into_iter()
            .filter(|s| s.user == user)
            .map(|s| s.topic)
            .collect())
    }

    pub async fn all(&self) -> StorageResult<Vec<Subscription>> {
        self.inner.all().await
    }

    /// Removes one subscription; returns 1 if it existed
    pub async fn remove(&self, topic: &str, user: &str) -> StorageResult<usize> {
        let (topic, user) = (topic.trim(), user.trim());
        self.inner
            .retain(|s| !(s.topic == topic && s.user == user))
            .await
    }

    /// Removes every subscription to `topic`
    pub async fn remove_topic(&self, topic: &str) -> StorageResult<usize> {
        let topic = topic.trim();
        self.inner.retain(|s| s.topic != topic).await
    }

    /// Removes every subscription held by `user`
    pub async fn remove_user(&self, user: &str) -> StorageResult<usize> {
        let user = user.trim();
        self.inner.retain(|s| s.user != user).await
    }

    /// Moves one subscription to a new topic and user; returns 1 if it existed
    ///
    /// If the target pair is already subscribed the two collapse into the
    /// existing entry.
    pub async fn update(
        &self,
        topic: &str,
        user: &str,
        new_topic: &str,
        new_user: &str,
    ) -> crate::Result<usize> {
        let target = Subscription::new(new_topic, new_user)?;
        let (topic, user) = (topic.trim(), user.trim());
        Ok(self
            .inner
            .rewrite(|s| {
                if s.topic != topic || s.user != user {
                    return false;
                }
                s.topic = target.topic.clone();
                s.user = target.user.clone();
                true
            })
            .await?)
    }

    /// Renames `topic` on every subscription in one write
    ///
    /// Returns how many subscriptions were renamed.
    pub async fn update_topic(&self, topic: &str, new_topic: &str) -> crate::Result<usize> {
        let new_topic = bounded_text("topic", new_topic, Subscription::MAX_LEN)?;
        let topic = topic.trim();
        Ok(self
            .inner
            .rewrite(|s| {
                if s.topic != topic {
                    return false;
                }
                s.topic = new_topic.clone();
                true
            })
            .await?)
    }

    /// Renames `user` on every subscription in one write
    ///
    /// Returns how many subscriptions were renamed.
    pub async fn update_user(&self, user: &str, new_user: &str) -> crate::Result<usize> {
        let new_user = bounded_text("user", new_user, Subscription::MAX_LEN)?;
        let user = user.trim();
        Ok(self
            .inner
            .rewrite(|s| {
                if s.user != user {
                    return false;
                }
                s.user = new_user.clone();
                true
            })
            .await?)
    }
}
