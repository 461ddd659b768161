use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure for Listing-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub scrape: ScrapeConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub parser: ParserConfig,
}

/// Scrape orchestration configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeConfig {
    /// Listing URL with a single `{}` placeholder for the page number
    #[serde(rename = "url-template")]
    pub url_template: String,

    /// Maximum value of `to_page - from_page` accepted in one request
    #[serde(rename = "max-page-span", default = "default_max_page_span")]
    pub max_page_span: u32,

    /// Attempts per page fetch, including the first one
    #[serde(rename = "retry-attempts", default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Backoff unit; attempt `n` waits `base * 2^n` after failing
    #[serde(rename = "backoff-base-ms", default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Ceiling on a single backoff wait (0 = uncapped)
    #[serde(rename = "max-backoff-ms", default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Topic that receives completion and failure messages
    #[serde(rename = "notify-topic", default = "default_notify_topic")]
    pub notify_topic: String,
}

impl ScrapeConfig {
    /// Builds a scrape section with defaults for everything but the template
    pub fn new(url_template: impl Into<String>) -> Self {
        Self {
            url_template: url_template.into(),
            max_page_span: default_max_page_span(),
            retry_attempts: default_retry_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            notify_topic: default_notify_topic(),
        }
    }
}

/// HTTP fetcher configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Which document storage strategy backs the repositories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Json,
    Sqlite,
}

/// Persistence configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,

    #[serde(rename = "data-dir", default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(rename = "products-file", default = "default_products_file")]
    pub products_file: String,

    #[serde(rename = "subscriptions-file", default = "default_subscriptions_file")]
    pub subscriptions_file: String,

    /// SQLite database file; relative paths live under `data-dir`
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: PathBuf,
}

impl StorageConfig {
    pub fn resolved_database_path(&self) -> PathBuf {
        if self.database_path.is_absolute() {
            self.database_path.clone()
        } else {
            self.data_dir.join(&self.database_path)
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            data_dir: default_data_dir(),
            products_file: default_products_file(),
            subscriptions_file: default_subscriptions_file(),
            database_path: default_database_path(),
        }
    }
}

/// Notification delivery configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    /// Recipient used when a topic has no subscribers
    #[serde(rename = "fallback-recipient", default = "default_fallback_recipient")]
    pub fallback_recipient: String,

    /// Optional endpoint that receives every delivery as JSON
    #[serde(rename = "webhook-url", default)]
    pub webhook_url: Option<String>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            fallback_recipient: default_fallback_recipient(),
            webhook_url: None,
        }
    }
}

/// CSS selectors used by the product list parser
#[derive(Debug, Clone, Deserialize)]
pub struct ParserConfig {
    #[serde(rename = "page-title", default = "default_page_title")]
    pub page_title: String,

    #[serde(rename = "product-container", default = "default_product_container")]
    pub product_container: String,

    #[serde(rename = "product-title", default = "default_product_title")]
    pub product_title: String,

    #[serde(rename = "product-price", default = "default_product_price")]
    pub product_price: String,

    #[serde(default = "default_image")]
    pub image: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            page_title: default_page_title(),
            product_container: default_product_container(),
            product_title: default_product_title(),
            product_price: default_product_price(),
            image: default_image(),
        }
    }
}

fn default_max_page_span() -> u32 {
    100
}

fn default_retry_attempts() -> u32 {
    5
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_max_backoff_ms() -> u64 {
    60_000
}

fn default_notify_topic() -> String {
    "scraping".to_string()
}

fn default_user_agent() -> String {
    format!("ListingHarvest/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_backend() -> StorageBackend {
    StorageBackend::Json
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data_directory")
}

fn default_products_file() -> String {
    "products.json".to_string()
}

fn default_subscriptions_file() -> String {
    "notifications.json".to_string()
}

fn default_database_path() -> PathBuf {
    PathBuf::from("harvest.db")
}

fn default_fallback_recipient() -> String {
    "default".to_string()
}

fn default_page_title() -> String {
    "head > title".to_string()
}

fn default_product_container() -> String {
    "#mf-shop-content > ul > li".to_string()
}

fn default_product_title() -> String {
    "div.mf-product-content > h2 > a".to_string()
}

fn default_product_price() -> String {
    "div.mf-product-price-box > span.price > span.woocommerce-Price-amount > bdi, \
     div.mf-product-price-box > span.price > ins > span > bdi"
        .to_string()
}

fn default_image() -> String {
    "img".to_string()
}
