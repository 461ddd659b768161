//! Scrape engine
//!
//! This module turns a page range into fetched, parsed and persisted records:
//! - Page range resolution and URL construction
//! - Retry with exponential backoff around each page fetch
//! - The fetcher and parser capabilities with their HTTP and HTML implementations
//! - The orchestrator that ties the stages together

mod fetcher;
mod orchestrator;
mod parser;
mod range;
mod retry;
mod stage;

pub use fetcher::{FetchError, HttpFetcher, PageFetcher};
pub use orchestrator::{ScrapeOrchestrator, ScrapeSummary};
pub use parser::{parse_price, ItemError, PageParser, ParseError, ProductListParser, UNKNOWN_CURRENCY};
pub use range::{page_url, PageRange, ScrapeRequest};
pub use retry::{RetryError, RetryPolicy};
pub use stage::ScrapeStage;
