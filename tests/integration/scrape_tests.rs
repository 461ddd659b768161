//! End-to-end scrape tests

use crate::common::{
    items, listing_item, listing_page, page_url, CapturingSink, ScriptedFetcher, TEMPLATE,
};
use listing_harvest::config::{ParserConfig, ScrapeConfig, StorageBackend, StorageConfig};
use listing_harvest::repository::ProductRepository;
use listing_harvest::scrape::{
    HttpFetcher, PageFetcher, ProductListParser, ScrapeOrchestrator, ScrapeRequest,
};
use listing_harvest::storage::{open_storages, JsonStorage};
use listing_harvest::{ErrorKind, Identified, Product, ScrapeError};
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_config(template: &str) -> ScrapeConfig {
    let mut config = ScrapeConfig::new(template);
    config.backoff_base_ms = 0;
    config
}

fn parser() -> Arc<ProductListParser> {
    Arc::new(ProductListParser::new(&ParserConfig::default()).unwrap())
}

struct Setup {
    _dir: TempDir,
    storage: Arc<JsonStorage>,
    products: Arc<ProductRepository>,
    sink: Arc<CapturingSink>,
}

fn setup() -> Setup {
    let dir = TempDir::new().unwrap();
    let storage = Arc::new(JsonStorage::new(dir.path(), "products.json").unwrap());
    let products = Arc::new(ProductRepository::new(storage.clone()));
    Setup {
        _dir: dir,
        storage,
        products,
        sink: Arc::new(CapturingSink::default()),
    }
}

fn orchestrator(setup: &Setup, fetcher: Arc<ScriptedFetcher>) -> ScrapeOrchestrator<Product> {
    ScrapeOrchestrator::new(
        fetcher,
        parser(),
        setup.products.clone(),
        setup.sink.clone(),
        fast_config(TEMPLATE),
    )
}

/// Page 3 has ten products; page 4 has six new ones and two from page 3
fn overlapping_pages() -> ScriptedFetcher {
    let page_three = items("p3", 10);
    let mut page_four = items("p4", 6);
    page_four.push(page_three[1].clone());
    page_four.push(page_three[7].clone());

    ScriptedFetcher::default()
        .with_page(3, listing_page(3, &page_three))
        .with_page(4, listing_page(4, &page_four))
}

#[tokio::test]
async fn test_page_count_scrape_merges_distinct_products() {
    let setup = setup();
    let fetcher = Arc::new(overlapping_pages());

    let summary = orchestrator(&setup, fetcher.clone())
        .scrape(ScrapeRequest::pages(3, 2))
        .await
        .unwrap();

    assert_eq!(summary.updated_count, 16);
    assert_eq!(summary.pages_fetched, 2);
    assert_eq!(summary.records_extracted, 18);
    assert_eq!(fetcher.requested_urls(), vec![page_url(3), page_url(4)]);
    assert_eq!(setup.products.count().await.unwrap(), 16);
    assert_eq!(
        setup.sink.messages.lock().unwrap().clone(),
        vec!["Scraping completed. 16 products updated.".to_string()]
    );
}

#[tokio::test]
async fn test_each_page_is_fetched_exactly_once() {
    let setup = setup();
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .with_page(2, listing_page(2, &items("q", 2)))
            .with_page(3, listing_page(3, &items("r", 2)))
            .with_page(4, listing_page(4, &items("s", 2)))
            .with_page(5, listing_page(5, &items("t", 2))),
    );

    let summary = orchestrator(&setup, fetcher.clone())
        .scrape(ScrapeRequest::range(2, 5))
        .await
        .unwrap();

    assert_eq!(summary.pages_fetched, 4);
    let mut requests = fetcher.requests();
    assert_eq!(requests.len(), 5 - 2 + 1);
    requests.sort();
    assert_eq!(requests, (2..=5).map(page_url).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_rescrape_is_idempotent() {
    let setup = setup();
    let fetcher = Arc::new(overlapping_pages());
    let orchestrator = orchestrator(&setup, fetcher);

    orchestrator.scrape(ScrapeRequest::range(3, 4)).await.unwrap();
    let before = std::fs::read(setup.storage.path()).unwrap();
    let first = setup.products.get("p3-1#101.0").await.unwrap().unwrap();

    let summary = orchestrator.scrape(ScrapeRequest::range(3, 4)).await.unwrap();

    assert_eq!(summary.updated_count, 0);
    assert_eq!(setup.products.get("p3-1#101.0").await.unwrap().unwrap(), first);
    assert_eq!(first.identity(), Some("p3-1#101.0"));

    // The entries are rewritten unchanged; only the envelope timestamp moves
    let after = std::fs::read(setup.storage.path()).unwrap();
    let entries = |bytes: &[u8]| serde_json::from_slice::<serde_json::Value>(bytes).unwrap()["entries"].clone();
    assert_eq!(entries(before.as_slice()), entries(after.as_slice()));
}

#[tokio::test]
async fn test_reversed_range_rejected_without_fetching() {
    let setup = setup();
    let fetcher = Arc::new(overlapping_pages());

    let err = orchestrator(&setup, fetcher.clone())
        .scrape(ScrapeRequest::range(5, 3))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidRange);
    assert!(err.is_user_error());
    assert!(fetcher.requested_urls().is_empty());
    assert!(!setup.storage.path().exists());

    let messages = setup.sink.messages.lock().unwrap().clone();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("Failed to scrape:"));
}

#[tokio::test]
async fn test_failed_fetch_leaves_store_unchanged() {
    let setup = setup();
    let seed = Arc::new(ScriptedFetcher::default().with_page(1, listing_page(1, &items("seed", 3))));
    orchestrator(&setup, seed)
        .scrape(ScrapeRequest::default())
        .await
        .unwrap();
    let before = std::fs::read(setup.storage.path()).unwrap();

    // Page 2 is missing and fails on every attempt
    let fetcher = Arc::new(ScriptedFetcher::default().with_page(1, listing_page(1, &items("new", 5))));
    let err = orchestrator(&setup, fetcher)
        .scrape(ScrapeRequest::range(1, 2))
        .await
        .unwrap_err();

    assert!(matches!(err, ScrapeError::FetchExhausted { ref url, .. } if *url == page_url(2)));
    assert_eq!(std::fs::read(setup.storage.path()).unwrap(), before);
}

#[tokio::test]
async fn test_malformed_item_is_skipped_not_fatal() {
    let setup = setup();
    let mut page = items("ok", 4);
    page.insert(1, listing_item("no-price", "call us"));
    let fetcher = Arc::new(ScriptedFetcher::default().with_page(1, listing_page(1, &page)));

    let summary = orchestrator(&setup, fetcher)
        .scrape(ScrapeRequest::default())
        .await
        .unwrap();

    assert_eq!(summary.records_extracted, 4);
    assert_eq!(summary.updated_count, 4);
}

#[tokio::test]
async fn test_concurrent_scrapes_do_not_lose_updates() {
    let setup = setup();
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .with_page(1, listing_page(1, &items("a", 20)))
            .with_page(2, listing_page(2, &items("b", 20)))
            .with_page(3, listing_page(3, &items("c", 20))),
    );
    let orchestrator = orchestrator(&setup, fetcher);

    let (left, right) = tokio::join!(
        orchestrator.scrape(ScrapeRequest::range(1, 2)),
        orchestrator.scrape(ScrapeRequest::range(2, 3)),
    );

    let inserted = left.unwrap().updated_count + right.unwrap().updated_count;
    assert_eq!(inserted, 60);
    assert_eq!(setup.products.count().await.unwrap(), 60);
}

#[tokio::test]
async fn test_http_scrape_retries_and_persists_to_sqlite() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/shop/page/1/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/shop/page/1/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(1, &items("w", 3))))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/shop/page/2/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(2, &items("x", 2))))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let storages = open_storages(&StorageConfig {
        backend: StorageBackend::Sqlite,
        data_dir: dir.path().to_path_buf(),
        ..Default::default()
    })
    .unwrap();
    let products = Arc::new(ProductRepository::new(storages.products));
    let fetcher = Arc::new(HttpFetcher::new(Default::default()));
    let sink = Arc::new(CapturingSink::default());

    let orchestrator: ScrapeOrchestrator<Product> = ScrapeOrchestrator::new(
        fetcher.clone(),
        parser(),
        products.clone(),
        sink,
        fast_config(&format!("{}/shop/page/{{}}/", server.uri())),
    );

    let summary = orchestrator.scrape(ScrapeRequest::range(1, 2)).await.unwrap();
    fetcher.close().await;

    assert_eq!(summary.updated_count, 5);
    let stored = products.get("w-2#102.0").await.unwrap().unwrap();
    assert_eq!(stored.currency, "INR");
    assert_eq!(stored.image_url, "https://cdn.example.com/w-2.jpg");
}

#[tokio::test]
async fn test_http_scrape_gives_up_after_configured_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let setup = setup();
    let mut config = fast_config(&format!("{}/shop/page/{{}}/", server.uri()));
    config.retry_attempts = 3;

    let orchestrator: ScrapeOrchestrator<Product> = ScrapeOrchestrator::new(
        Arc::new(HttpFetcher::new(Default::default())),
        parser(),
        setup.products.clone(),
        setup.sink.clone(),
        config,
    );

    let err = orchestrator.scrape(ScrapeRequest::default()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::FetchExhausted);
    assert_eq!(
        err.to_string(),
        format!(
            "Failed to fetch {}/shop/page/1/: All 3 retries failed",
            server.uri()
        )
    );
}
