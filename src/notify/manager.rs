//! Topic fan-out over the subscription repository

use crate::notify::traits::{DeliveryReport, DeliveryStrategy, NotificationSink, NotifyError};
use crate::repository::SubscriptionRepository;
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};

pub const DEFAULT_FALLBACK_RECIPIENT: &str = "default";

/// Delivers topic notifications to every current subscriber
///
/// Subscribers are looked up fresh on every call, so changes made between
/// scrapes are always seen. Deliveries run concurrently and a failing
/// subscriber never prevents delivery to the others.
pub struct NotificationManager {
    subscriptions: Arc<SubscriptionRepository>,
    strategy: Arc<dyn DeliveryStrategy>,
    fallback_recipient: String,
}

impl NotificationManager {
    pub fn new(
        subscriptions: Arc<SubscriptionRepository>,
        strategy: Arc<dyn DeliveryStrategy>,
    ) -> Self {
        Self {
            subscriptions,
            strategy,
            fallback_recipient: DEFAULT_FALLBACK_RECIPIENT.to_string(),
        }
    }

    pub fn with_fallback_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.fallback_recipient = recipient.into();
        self
    }

    pub fn fallback_recipient(&self) -> &str {
        &self.fallback_recipient
    }

    /// Sends one message to one recipient through the configured strategy
    pub async fn send_notification(&self, recipient: &str, message: &str) -> Result<(), NotifyError> {
        debug!(
            recipient,
            strategy = self.strategy.name(),
            "Sending notification"
        );
        self.strategy.deliver(recipient, message).await
    }

    async fn deliver_to_fallback(&self, topic: &str, message: &str) -> DeliveryReport {
        warn!(
            topic,
            recipient = %self.fallback_recipient,
            "No users subscribed to topic, using fallback recipient"
        );

        let outcome = self
            .send_notification(&self.fallback_recipient, message)
            .instrument(info_span!("delivery", fallback = true))
            .await;

        match outcome {
            Ok(()) => DeliveryReport {
                delivered: 1,
                failed: 0,
                fallback: true,
            },
            Err(e) => {
                warn!(
                    recipient = %self.fallback_recipient,
                    fallback = true,
                    "Notification delivery failed: {}",
                    e
                );
                DeliveryReport {
                    delivered: 0,
                    failed: 1,
                    fallback: true,
                }
            }
        }
    }
}

#[async_trait]
impl NotificationSink for NotificationManager {
    async fn notify(&self, topic: &str, message: &str) -> Result<DeliveryReport, NotifyError> {
        let users = self.subscriptions.users_by_topic(topic).await?;

        if users.is_empty() {
            return Ok(self.deliver_to_fallback(topic, message).await);
        }

        let outcomes = join_all(users.iter().map(|user| async move {
            let outcome = self
                .send_notification(user, message)
                .instrument(info_span!("delivery", fallback = false))
                .await;
            (user, outcome)
        }))
        .await;

        let mut report = DeliveryReport::default();
        for (user, outcome) in outcomes {
            match outcome {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!(recipient = %user, "Notification delivery failed: {}", e);
                    report.failed += 1;
                }
            }
        }

        info!(
            topic,
            delivered = report.delivered,
            failed = report.failed,
            "Notification fan-out finished"
        );

        Ok(report)
    }
}
