//! Page fetching
//!
//! The orchestrator only depends on the [`PageFetcher`] trait. [`HttpFetcher`]
//! is the reqwest-backed implementation: it builds one client per proxy the
//! first time that proxy is used and keeps it until [`PageFetcher::close`].

use crate::config::FetcherConfig;
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Errors from a single fetch attempt
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Invalid proxy '{proxy}': {message}")]
    Proxy { proxy: String, message: String },
}

/// Retrieves the raw content of a page
///
/// Implementations must be safe to call concurrently for independent URLs.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, proxy: Option<&str>) -> Result<String, FetchError>;

    /// Releases shared resources; a later fetch may acquire them again
    async fn close(&self) {}
}

/// reqwest-backed fetcher with lazily created, shared clients
pub struct HttpFetcher {
    config: FetcherConfig,
    clients: Mutex<HashMap<Option<String>, Client>>,
}

impl HttpFetcher {
    pub fn new(config: FetcherConfig) -> Self {
        Self {
            config,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Number of clients currently held open
    pub async fn open_clients(&self) -> usize {
        self.clients.lock().await.len()
    }

    async fn client_for(&self, proxy: Option<&str>) -> Result<Client, FetchError> {
        let key = proxy.map(str::to_string);
        let mut clients = self.clients.lock().await;

        if let Some(client) = clients.get(&key) {
            return Ok(client.clone());
        }

        let client = self.build_client(proxy)?;
        debug!(proxy = ?proxy, "Initialized HTTP client");
        clients.insert(key, client.clone());
        Ok(client)
    }

    fn build_client(&self, proxy: Option<&str>) -> Result<Client, FetchError> {
        let mut builder = Client::builder()
            .user_agent(&self.config.user_agent)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true);

        if let Some(proxy) = proxy {
            let proxy = reqwest::Proxy::all(proxy).map_err(|e| FetchError::Proxy {
                proxy: proxy.to_string(),
                message: e.to_string(),
            })?;
            builder = builder.proxy(proxy);
        }

        Ok(builder.build()?)
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, proxy: Option<&str>) -> Result<String, FetchError> {
        let client = self.client_for(proxy).await?;
        let response = client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        debug!(url, bytes = body.len(), "Fetched page");
        Ok(body)
    }

    async fn close(&self) {
        let mut clients = self.clients.lock().await;
        if !clients.is_empty() {
            info!("Releasing {} HTTP client(s)", clients.len());
            clients.clear();
        }
    }
}
