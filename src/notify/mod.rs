//! Notification delivery
//!
//! A [`NotificationSink`] fans a message out to every subscriber of a topic.
//! How a single message reaches a single recipient is a [`DeliveryStrategy`]:
//! log lines, a webhook, or several at once.

pub mod console;
pub mod manager;
pub mod multi;
pub mod traits;
pub mod webhook;

pub use console::ConsoleDelivery;
pub use manager::{NotificationManager, DEFAULT_FALLBACK_RECIPIENT};
pub use multi::MultiDelivery;
pub use traits::{DeliveryReport, DeliveryStrategy, NotificationSink, NotifyError};
pub use webhook::WebhookDelivery;

use crate::config::NotificationConfig;
use std::sync::Arc;
use std::time::Duration;

/// Builds the delivery strategy described by the configuration
///
/// Console delivery is always present; a webhook is added when configured.
pub fn build_delivery(
    config: &NotificationConfig,
    timeout: Duration,
) -> Result<Arc<dyn DeliveryStrategy>, NotifyError> {
    match &config.webhook_url {
        Some(url) => {
            let webhook = WebhookDelivery::new(url.clone(), timeout)?;
            Ok(Arc::new(MultiDelivery::new(vec![
                Arc::new(ConsoleDelivery),
                Arc::new(webhook),
            ])))
        }
        None => Ok(Arc::new(ConsoleDelivery)),
    }
}
