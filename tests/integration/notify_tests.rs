//! Notification fan-out against persisted subscriptions and a webhook

use crate::common::{items, listing_page, ScriptedFetcher, TEMPLATE};
use listing_harvest::config::{NotificationConfig, ParserConfig, ScrapeConfig};
use listing_harvest::notify::{build_delivery, NotificationManager, NotificationSink, WebhookDelivery};
use listing_harvest::repository::{ProductRepository, SubscriptionRepository};
use listing_harvest::scrape::{ProductListParser, ScrapeOrchestrator, ScrapeRequest};
use listing_harvest::storage::JsonStorage;
use listing_harvest::Product;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn expect_delivery(server: &MockServer, recipient: &str, status: u16, times: u64) {
    Mock::given(method("POST"))
        .and(path("/notify"))
        .and(body_partial_json(serde_json::json!({ "recipient": recipient })))
        .respond_with(ResponseTemplate::new(status))
        .expect(times)
        .mount(server)
        .await;
}

fn subscriptions(dir: &TempDir) -> Arc<SubscriptionRepository> {
    Arc::new(SubscriptionRepository::new(Arc::new(
        JsonStorage::new(dir.path(), "notifications.json").unwrap(),
    )))
}

fn webhook(server: &MockServer) -> Arc<WebhookDelivery> {
    Arc::new(WebhookDelivery::new(format!("{}/notify", server.uri()), Duration::from_secs(5)).unwrap())
}

#[tokio::test]
async fn test_every_subscriber_receives_despite_one_failure() {
    let server = MockServer::start().await;
    expect_delivery(&server, "alice", 200, 1).await;
    expect_delivery(&server, "bob", 500, 1).await;
    expect_delivery(&server, "carol", 200, 1).await;
    expect_delivery(&server, "default", 200, 0).await;

    let dir = TempDir::new().unwrap();
    let subs = subscriptions(&dir);
    subs.add_users_to_topic("scraping", &["alice", "bob", "carol"])
        .await
        .unwrap();

    let manager = NotificationManager::new(subs, webhook(&server));
    let report = manager.notify("scraping", "hello").await.unwrap();

    assert_eq!(report.delivered, 2);
    assert_eq!(report.failed, 1);
    assert!(!report.fallback);
}

#[tokio::test]
async fn test_subscriptions_survive_reopening_the_store() {
    let server = MockServer::start().await;
    expect_delivery(&server, "alice", 200, 1).await;
    expect_delivery(&server, "default", 200, 0).await;

    let dir = TempDir::new().unwrap();
    subscriptions(&dir).add("scraping", "alice").await.unwrap();

    let reopened = subscriptions(&dir);
    assert_eq!(reopened.add("scraping", "alice").await.unwrap(), 0);

    let manager = NotificationManager::new(reopened, webhook(&server));
    manager.notify("scraping", "hello").await.unwrap();
}

#[tokio::test]
async fn test_scrape_outcome_reaches_fallback_recipient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/notify"))
        .and(body_partial_json(serde_json::json!({
            "recipient": "ops",
            "message": "Scraping completed. 3 products updated."
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = NotificationConfig {
        fallback_recipient: "ops".to_string(),
        webhook_url: Some(format!("{}/notify", server.uri())),
    };
    let delivery = build_delivery(&config, Duration::from_secs(5)).unwrap();
    let manager = NotificationManager::new(subscriptions(&dir), delivery)
        .with_fallback_recipient(config.fallback_recipient.clone());

    let products = Arc::new(ProductRepository::new(Arc::new(
        JsonStorage::new(dir.path(), "products.json").unwrap(),
    )));
    let fetcher = Arc::new(ScriptedFetcher::default().with_page(1, listing_page(1, &items("z", 3))));

    let orchestrator: ScrapeOrchestrator<Product> = ScrapeOrchestrator::new(
        fetcher,
        Arc::new(ProductListParser::new(&ParserConfig::default()).unwrap()),
        products,
        Arc::new(manager),
        ScrapeConfig::new(TEMPLATE),
    );

    let summary = orchestrator.scrape(ScrapeRequest::default()).await.unwrap();
    assert_eq!(summary.updated_count, 3);
}
