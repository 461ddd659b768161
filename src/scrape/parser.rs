//! Product list parsing
//!
//! [`PageParser`] turns one page of raw content into records. The
//! [`ProductListParser`] implementation reads a shop listing with
//! configurable CSS selectors. A malformed product is logged and skipped;
//! only a page that cannot be read at all fails the parse.

use crate::config::ParserConfig;
use crate::model::{ModelError, Product};
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Known currency symbols, checked in order
const CURRENCY_SYMBOLS: &[(&str, &str)] = &[
    ("₹", "INR"),
    ("€", "EUR"),
    ("£", "GBP"),
    ("¥", "JPY"),
    ("$", "USD"),
];

/// Reported when a price carries no known symbol
pub const UNKNOWN_CURRENCY: &str = "UNKNOWN";

/// Page-level parse failures
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("Malformed page: {0}")]
    Malformed(String),
}

/// Why a single item was skipped
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("missing {0}")]
    Missing(&'static str),

    #[error("unparseable price '{0}'")]
    Price(String),

    #[error(transparent)]
    Invalid(#[from] ModelError),
}

/// Extracts records from raw page content
///
/// Parsing is CPU-bound and synchronous; the orchestrator runs it on the
/// blocking pool.
pub trait PageParser: Send + Sync {
    type Record: Send + 'static;

    fn parse(&self, content: &str) -> Result<Vec<Self::Record>, ParseError>;
}

/// Parses shop listing pages into [`Product`]s
#[derive(Debug)]
pub struct ProductListParser {
    page_title: Selector,
    container: Selector,
    title: Selector,
    price: Selector,
    image: Selector,
}

impl ProductListParser {
    pub fn new(config: &ParserConfig) -> Result<Self, ParseError> {
        Ok(Self {
            page_title: compile(&config.page_title)?,
            container: compile(&config.product_container)?,
            title: compile(&config.product_title)?,
            price: compile(&config.product_price)?,
            image: compile(&config.image)?,
        })
    }

    fn parse_item(&self, item: ElementRef<'_>) -> Result<Product, ItemError> {
        let image_url = item
            .select(&self.image)
            .next()
            .and_then(|img| img.value().attr("src"))
            .ok_or(ItemError::Missing("image"))?;

        let href = item
            .select(&self.title)
            .next()
            .and_then(|link| link.value().attr("href"))
            .ok_or(ItemError::Missing("title link"))?;
        let title = title_from_href(href).ok_or(ItemError::Missing("title"))?;

        let price_text = item
            .select(&self.price)
            .next()
            .map(|price| price.text().collect::<String>())
            .ok_or(ItemError::Missing("price"))?;
        let (price, currency) = parse_price(&price_text)?;

        Ok(Product::new(title, price, currency, image_url)?)
    }
}

impl PageParser for ProductListParser {
    type Record = Product;

    fn parse(&self, content: &str) -> Result<Vec<Product>, ParseError> {
        let document = Html::parse_document(content);

        let title = document
            .select(&self.page_title)
            .next()
            .map(|t| t.text().collect::<String>().trim().to_string())
            .ok_or_else(|| ParseError::Malformed("page has no title".to_string()))?;
        let page = page_label(&title);
        info!(page = %page, "Parsing page: {}", title);

        let mut products = Vec::new();
        for (index, item) in document.select(&self.container).enumerate() {
            debug!(page = %page, item = index, "Processing product");
            match self.parse_item(item) {
                Ok(product) => products.push(product),
                Err(e) => warn!(page = %page, item = index, "Skipping product: {}", e),
            }
        }

        info!(page = %page, "Parsed {} products from {}", products.len(), title);
        Ok(products)
    }
}

fn compile(selector: &str) -> Result<Selector, ParseError> {
    Selector::parse(selector).map_err(|e| ParseError::InvalidSelector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

/// Second-to-last path segment of a product link
/// (`https://shop/product/blue-widget/` gives `blue-widget`)
fn title_from_href(href: &str) -> Option<&str> {
    let segments: Vec<&str> = href.split('/').collect();
    let slug = segments.len().checked_sub(2).map(|i| segments[i])?;
    (!slug.trim().is_empty()).then_some(slug)
}

/// Page number from a `... Page N ...` title, or the title itself
fn page_label(title: &str) -> String {
    title
        .split("Page ")
        .skip(1)
        .find_map(|rest| {
            let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
            digits.parse::<u32>().ok()
        })
        .map(|n| n.to_string())
        .unwrap_or_else(|| title.to_string())
}

/// Splits raw price text into an amount and a currency code
///
/// The first known symbol found decides the code; it and any thousands
/// separators are stripped before the amount is read.
pub fn parse_price(text: &str) -> Result<(f64, &'static str), ItemError> {
    let (cleaned, code) = match CURRENCY_SYMBOLS
        .iter()
        .find(|(symbol, _)| text.contains(symbol))
    {
        Some((symbol, code)) => (text.replace(symbol, ""), *code),
        None => (text.to_string(), UNKNOWN_CURRENCY),
    };

    cleaned
        .replace(',', "")
        .trim()
        .parse::<f64>()
        .map(|amount| (amount, code))
        .map_err(|_| ItemError::Price(text.trim().to_string()))
}
