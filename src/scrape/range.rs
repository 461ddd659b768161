//! Page range resolution and URL construction

use crate::config::PAGE_PLACEHOLDER;
use crate::ScrapeError;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Parameters of one scrape invocation
///
/// `page_count`, when present, overrides `to_page`. With neither given only
/// `from_page` is scraped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeRequest {
    #[serde(default = "default_from_page")]
    pub from_page: u32,

    #[serde(default)]
    pub to_page: Option<u32>,

    #[serde(default)]
    pub page_count: Option<u32>,

    /// Proxy URL handed to the fetcher for every page
    #[serde(default)]
    pub proxy: Option<String>,
}

impl Default for ScrapeRequest {
    fn default() -> Self {
        Self {
            from_page: default_from_page(),
            to_page: None,
            page_count: None,
            proxy: None,
        }
    }
}

impl ScrapeRequest {
    /// `count` pages starting at `from_page`
    pub fn pages(from_page: u32, count: u32) -> Self {
        Self {
            from_page,
            page_count: Some(count),
            ..Default::default()
        }
    }

    /// Pages `from_page..=to_page`
    pub fn range(from_page: u32, to_page: u32) -> Self {
        Self {
            from_page,
            to_page: Some(to_page),
            ..Default::default()
        }
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }
}

fn default_from_page() -> u32 {
    1
}

/// A validated, inclusive range of page numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    from: u32,
    to: u32,
}

impl PageRange {
    /// Resolves and validates the range described by `request`
    ///
    /// Fails with `InvalidRange` for a zero start page, a zero page count or
    /// an end before the start, and with `RangeTooLarge` when
    /// `to - from` exceeds `max_span`.
    pub fn resolve(request: &ScrapeRequest, max_span: u32) -> Result<Self, ScrapeError> {
        let from = request.from_page;
        if from < 1 {
            return Err(ScrapeError::InvalidRange(format!(
                "from_page must be >= 1, got {}",
                from
            )));
        }

        let to = match request.page_count {
            Some(0) => {
                return Err(ScrapeError::InvalidRange(
                    "page_count must be >= 1".to_string(),
                ))
            }
            Some(count) => u64::from(from) + u64::from(count) - 1,
            None => u64::from(request.to_page.unwrap_or(from)),
        };

        if to < u64::from(from) {
            return Err(ScrapeError::InvalidRange(format!(
                "to_page ({}) must be >= from_page ({})",
                to, from
            )));
        }

        let span = to - u64::from(from);
        if span > u64::from(max_span) {
            return Err(ScrapeError::RangeTooLarge {
                span,
                max: max_span,
            });
        }

        let to = u32::try_from(to).map_err(|_| ScrapeError::RangeTooLarge {
            span,
            max: max_span,
        })?;

        Ok(Self { from, to })
    }

    pub fn from(&self) -> u32 {
        self.from
    }

    pub fn to(&self) -> u32 {
        self.to
    }

    pub fn pages(&self) -> RangeInclusive<u32> {
        self.from..=self.to
    }

    /// Number of pages in the range (never zero)
    pub fn page_count(&self) -> usize {
        (self.to - self.from) as usize + 1
    }

    /// One `(page, url)` pair per page, in page order
    pub fn build_urls(&self, template: &str) -> Vec<(u32, String)> {
        self.pages()
            .map(|page| (page, page_url(template, page)))
            .collect()
    }
}

/// Substitutes `page` for the placeholder in `template`
pub fn page_url(template: &str, page: u32) -> String {
    template.replacen(PAGE_PLACEHOLDER, &page.to_string(), 1)
}
