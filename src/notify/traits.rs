//! Notification traits and error types

use crate::storage::StorageError;
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while notifying
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Delivery to '{recipient}' failed: {message}")]
    Delivery { recipient: String, message: String },

    #[error("Webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Subscriber lookup failed: {0}")]
    Lookup(#[from] StorageError),
}

/// Outcome of one `notify` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Deliveries that succeeded
    pub delivered: usize,

    /// Deliveries that failed (logged, never raised)
    pub failed: usize,

    /// True when the topic had no subscribers and the fallback recipient
    /// received the message instead
    pub fallback: bool,
}

impl DeliveryReport {
    pub fn attempted(&self) -> usize {
        self.delivered + self.failed
    }
}

/// One way of getting a message to one recipient
#[async_trait]
pub trait DeliveryStrategy: Send + Sync {
    async fn deliver(&self, recipient: &str, message: &str) -> Result<(), NotifyError>;

    /// Short name used in log lines
    fn name(&self) -> &'static str;
}

/// Topic-based fan-out consumed by the scrape orchestrator
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Delivers `message` to every subscriber of `topic`
    ///
    /// Individual delivery failures are counted in the report, not returned.
    async fn notify(&self, topic: &str, message: &str) -> Result<DeliveryReport, NotifyError>;
}
