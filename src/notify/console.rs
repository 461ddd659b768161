use crate::notify::traits::{DeliveryStrategy, NotifyError};
use async_trait::async_trait;

/// Delivers notifications as structured log lines
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleDelivery;

#[async_trait]
impl DeliveryStrategy for ConsoleDelivery {
    async fn deliver(&self, recipient: &str, message: &str) -> Result<(), NotifyError> {
        tracing::info!(target: "listing_harvest::notification", recipient, "Notification: {}", message);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "console"
    }
}
