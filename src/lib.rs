//! Listing-Harvest: a paginated product listing scraper
//!
//! This crate turns a page range into a set of concurrent fetch+parse
//! operations, merges the extracted products into a deduplicating store and
//! reports the outcome to topic subscribers.

pub mod config;
pub mod model;
pub mod notify;
pub mod repository;
pub mod scrape;
pub mod storage;

use thiserror::Error;

/// Main error type for Listing-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Invalid record: {0}")]
    Model(#[from] model::ModelError),

    #[error("User '{user}' is already subscribed to topic '{topic}'")]
    DuplicateSubscription { topic: String, user: String },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors surfaced by a single scrape invocation
///
/// Every variant except [`ScrapeError::Task`] corresponds to one of the
/// documented failure kinds; see [`ScrapeError::kind`].
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Invalid page range: {0}")]
    InvalidRange(String),

    #[error("Page range too large: span of {span} exceeds the maximum of {max}")]
    RangeTooLarge { span: u64, max: u32 },

    #[error("Failed to fetch {url}: {source}")]
    FetchExhausted {
        url: String,
        #[source]
        source: scrape::RetryError,
    },

    #[error("Failed to parse page {page}: {source}")]
    Parse {
        page: u32,
        #[source]
        source: scrape::ParseError,
    },

    #[error("Persistence failure: {0}")]
    Persistence(#[from] storage::StorageError),

    #[error("Background task did not complete: {0}")]
    Task(String),
}

/// Coarse classification of a [`ScrapeError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidRange,
    RangeTooLarge,
    FetchExhausted,
    ParseFailure,
    PersistenceFailure,
    Internal,
}

impl ScrapeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRange(_) => ErrorKind::InvalidRange,
            Self::RangeTooLarge { .. } => ErrorKind::RangeTooLarge,
            Self::FetchExhausted { .. } => ErrorKind::FetchExhausted,
            Self::Parse { .. } => ErrorKind::ParseFailure,
            Self::Persistence(_) => ErrorKind::PersistenceFailure,
            Self::Task(_) => ErrorKind::Internal,
        }
    }

    /// Returns true for errors caused by caller input rather than infrastructure
    pub fn is_user_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::InvalidRange | ErrorKind::RangeTooLarge
        )
    }
}

/// Result type alias for Listing-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use model::{Identified, Product, Subscription};
pub use scrape::{ScrapeOrchestrator, ScrapeRequest, ScrapeSummary};
