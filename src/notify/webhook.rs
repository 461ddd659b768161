//! HTTP webhook delivery
//!
//! Each delivery is one POST of `{"recipient": ..., "message": ...}` to the
//! configured endpoint. A non-2xx answer counts as a failed delivery.

use crate::notify::traits::{DeliveryStrategy, NotifyError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

#[derive(Serialize)]
struct WebhookPayload<'a> {
    recipient: &'a str,
    message: &'a str,
}

/// Posts notifications to a webhook endpoint
#[derive(Debug, Clone)]
pub struct WebhookDelivery {
    client: Client,
    url: String,
}

impl WebhookDelivery {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl DeliveryStrategy for WebhookDelivery {
    async fn deliver(&self, recipient: &str, message: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(&WebhookPayload { recipient, message })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Webhook responded [{}] for {}: {}", status, recipient, body);
            return Err(NotifyError::Delivery {
                recipient: recipient.to_string(),
                message: format!("webhook returned HTTP {}", status.as_u16()),
            });
        }

        tracing::debug!("Webhook delivered to {} [{}]", recipient, status);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "webhook"
    }
}
