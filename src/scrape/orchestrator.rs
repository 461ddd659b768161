//! Scrape orchestration
//!
//! One `scrape` call walks through validation, concurrent fetching,
//! concurrent parsing, a single merge into the record store and a closing
//! notification. The fetch stage is an all-or-nothing barrier: the first
//! page that exhausts its retries aborts the remaining fetches and nothing
//! is written.

use crate::config::ScrapeConfig;
use crate::notify::NotificationSink;
use crate::repository::RecordStore;
use crate::scrape::fetcher::PageFetcher;
use crate::scrape::parser::PageParser;
use crate::scrape::range::{PageRange, ScrapeRequest};
use crate::scrape::retry::RetryPolicy;
use crate::scrape::stage::ScrapeStage;
use crate::ScrapeError;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, info_span, warn, Instrument, Span};

static NEXT_SCRAPE_ID: AtomicU64 = AtomicU64::new(1);

/// Result of a successful scrape
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScrapeSummary {
    /// Correlation id shared by every log line of the invocation
    pub scrape_id: u64,

    /// Records that were new to the store
    pub updated_count: usize,

    pub pages_fetched: usize,

    pub records_extracted: usize,
}

/// Composes a fetcher, a parser, a record store and a notification sink
pub struct ScrapeOrchestrator<R> {
    fetcher: Arc<dyn PageFetcher>,
    parser: Arc<dyn PageParser<Record = R>>,
    store: Arc<dyn RecordStore<R>>,
    sink: Arc<dyn NotificationSink>,
    config: ScrapeConfig,
    retry: RetryPolicy,
    parent_span: Option<Span>,
}

impl<R: Send + 'static> ScrapeOrchestrator<R> {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        parser: Arc<dyn PageParser<Record = R>>,
        store: Arc<dyn RecordStore<R>>,
        sink: Arc<dyn NotificationSink>,
        config: ScrapeConfig,
    ) -> Self {
        let retry = RetryPolicy::from_config(&config);
        Self {
            fetcher,
            parser,
            store,
            sink,
            config,
            retry,
            parent_span: None,
        }
    }

    /// Parents every invocation span under `span`
    pub fn with_span(mut self, span: Span) -> Self {
        self.parent_span = Some(span);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &ScrapeConfig {
        &self.config
    }

    /// Runs one scrape invocation
    ///
    /// The outcome is reported to the configured topic whether it succeeds
    /// or fails; a failing notification is logged and never changes the
    /// result.
    pub async fn scrape(&self, request: ScrapeRequest) -> Result<ScrapeSummary, ScrapeError> {
        let scrape_id = NEXT_SCRAPE_ID.fetch_add(1, Ordering::Relaxed);
        let span = match &self.parent_span {
            Some(parent) => info_span!(parent: parent, "scrape", scrape_id),
            None => info_span!("scrape", scrape_id),
        };

        async move {
            let mut stage = ScrapeStage::Validating;
            match self.run(scrape_id, &request, &mut stage).await {
                Ok(summary) => {
                    advance(&mut stage, ScrapeStage::Notifying);
                    self.report(&format!(
                        "Scraping completed. {} products updated.",
                        summary.updated_count
                    ))
                    .await;
                    advance(&mut stage, ScrapeStage::Completed);
                    info!(
                        updated = summary.updated_count,
                        pages = summary.pages_fetched,
                        records = summary.records_extracted,
                        "Scrape completed"
                    );
                    Ok(summary)
                }
                Err(e) => {
                    error!(stage = %stage, kind = ?e.kind(), "Scrape failed: {}", e);
                    advance(&mut stage, ScrapeStage::Notifying);
                    self.report(&format!("Failed to scrape: {}", e)).await;
                    advance(&mut stage, ScrapeStage::Failed);
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        scrape_id: u64,
        request: &ScrapeRequest,
        stage: &mut ScrapeStage,
    ) -> Result<ScrapeSummary, ScrapeError> {
        let range = PageRange::resolve(request, self.config.max_page_span)?;
        info!(
            from_page = range.from(),
            to_page = range.to(),
            proxy = ?request.proxy,
            "Starting scrape of {} page(s)",
            range.page_count()
        );

        advance(stage, ScrapeStage::Fetching);
        let pages = self
            .fetch_all(range.build_urls(&self.config.url_template), request.proxy.clone())
            .await?;
        let pages_fetched = pages.len();

        advance(stage, ScrapeStage::Parsing);
        let records: Vec<R> = self.parse_all(pages).await?.into_iter().flatten().collect();
        let records_extracted = records.len();

        advance(stage, ScrapeStage::Persisting);
        let updated_count = self.store.merge(records).await?;

        Ok(ScrapeSummary {
            scrape_id,
            updated_count,
            pages_fetched,
            records_extracted,
        })
    }

    /// Fetches every page concurrently, returning contents in page order
    async fn fetch_all(
        &self,
        urls: Vec<(u32, String)>,
        proxy: Option<String>,
    ) -> Result<Vec<(u32, String)>, ScrapeError> {
        let mut slots: Vec<Option<(u32, String)>> = vec![None; urls.len()];
        let mut tasks = JoinSet::new();

        for (index, (page, url)) in urls.into_iter().enumerate() {
            let fetcher = Arc::clone(&self.fetcher);
            let retry = self.retry.clone();
            let proxy = proxy.clone();

            tasks.spawn(
                async move {
                    let result = retry
                        .run(&url, || fetcher.fetch(&url, proxy.as_deref()))
                        .await;
                    (index, page, url, result)
                }
                .instrument(info_span!("fetch", page)),
            );
        }

        while let Some(joined) = tasks.join_next().await {
            let (index, page, url, result) =
                joined.map_err(|e| ScrapeError::Task(format!("fetch task: {}", e)))?;

            match result {
                Ok(content) => {
                    debug!(page, bytes = content.len(), "Page fetched");
                    slots[index] = Some((page, content));
                }
                Err(source) => {
                    tasks.abort_all();
                    return Err(ScrapeError::FetchExhausted { url, source });
                }
            }
        }

        Ok(slots.into_iter().flatten().collect())
    }

    /// Parses every page on the blocking pool, returning records per page in
    /// page order
    async fn parse_all(&self, pages: Vec<(u32, String)>) -> Result<Vec<Vec<R>>, ScrapeError> {
        let handles: Vec<_> = pages
            .into_iter()
            .map(|(page, content)| {
                let parser = Arc::clone(&self.parser);
                let span = info_span!("parse", page);
                let handle = tokio::task::spawn_blocking(move || {
                    let _entered = span.enter();
                    parser.parse(&content)
                });
                (page, handle)
            })
            .collect();

        let mut parsed = Vec::with_capacity(handles.len());
        for (page, handle) in handles {
            let records = handle
                .await
                .map_err(|e| ScrapeError::Task(format!("parser for page {}: {}", page, e)))?
                .map_err(|source| ScrapeError::Parse { page, source })?;
            debug!(page, records = records.len(), "Page parsed");
            parsed.push(records);
        }

        Ok(parsed)
    }

    async fn report(&self, message: &str) {
        match self.sink.notify(&self.config.notify_topic, message).await {
            Ok(report) => debug!(
                topic = %self.config.notify_topic,
                delivered = report.delivered,
                failed = report.failed,
                fallback = report.fallback,
                "Outcome notification sent"
            ),
            Err(e) => warn!(
                topic = %self.config.notify_topic,
                "Outcome notification failed: {}",
                e
            ),
        }
    }
}

fn advance(stage: &mut ScrapeStage, next: ScrapeStage) {
    debug!(from = %stage, to = %next, "Stage transition");
    *stage = next;
}
