use crate::notify::traits::{DeliveryStrategy, NotifyError};
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;

/// Delivers through several strategies at once
///
/// Every strategy is attempted; one failing does not stop the others. The
/// delivery fails if any strategy failed.
pub struct MultiDelivery {
    strategies: Vec<Arc<dyn DeliveryStrategy>>,
}

impl MultiDelivery {
    pub fn new(strategies: Vec<Arc<dyn DeliveryStrategy>>) -> Self {
        Self { strategies }
    }
}

#[async_trait]
impl DeliveryStrategy for MultiDelivery {
    async fn deliver(&self, recipient: &str, message: &str) -> Result<(), NotifyError> {
        let results = join_all(
            self.strategies
                .iter()
                .map(|strategy| strategy.deliver(recipient, message)),
        )
        .await;

        let failures: Vec<String> = self
            .strategies
            .iter()
            .zip(results)
            .filter_map(|(strategy, result)| {
                result
                    .err()
                    .map(|e| format!("{}: {}", strategy.name(), e))
            })
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(NotifyError::Delivery {
                recipient: recipient.to_string(),
                message: failures.join("; "),
            })
        }
    }

    fn name(&self) -> &'static str {
        "multi"
    }
}
