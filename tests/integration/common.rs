use async_trait::async_trait;
use listing_harvest::notify::{DeliveryReport, NotificationSink, NotifyError};
use listing_harvest::scrape::{FetchError, PageFetcher};
use std::collections::HashMap;
use std::sync::Mutex;

pub const TEMPLATE: &str = "https://shop.example.com/shop/page/{}/";

pub fn page_url(page: u32) -> String {
    TEMPLATE.replace("{}", &page.to_string())
}

/// One listing entry rendered the way the shop does
pub fn listing_item(slug: &str, price: &str) -> String {
    format!(
        r#"<li class="product">
            <div class="mf-product-thumbnail"><a href="https://shop.example.com/product/{slug}/"><img src="https://cdn.example.com/{slug}.jpg" alt="{slug}"></a></div>
            <div class="mf-product-content"><h2><a href="https://shop.example.com/product/{slug}/">{slug}</a></h2></div>
            <div class="mf-product-price-box"><span class="price"><span class="woocommerce-Price-amount amount"><bdi><span class="woocommerce-Price-currencySymbol">₹</span>{price}</bdi></span></span></div>
        </li>"#
    )
}

/// A full listing page containing `items`
pub fn listing_page(page: u32, items: &[String]) -> String {
    format!(
        r#"<!DOCTYPE html>
        <html><head><title>Shop - Page {page} - Example Store</title></head>
        <body><div id="mf-shop-content"><ul class="products">{}</ul></div></body></html>"#,
        items.join("\n")
    )
}

/// `count` items named `{prefix}-{n}` priced `100 + n`
pub fn items(prefix: &str, count: usize) -> Vec<String> {
    (0..count)
        .map(|n| listing_item(&format!("{prefix}-{n}"), &format!("{}.00", 100 + n)))
        .collect()
}

/// Serves canned pages by URL and records every request
#[derive(Default)]
pub struct ScriptedFetcher {
    pages: HashMap<String, String>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn with_page(mut self, page: u32, content: String) -> Self {
        self.pages.insert(page_url(page), content);
        self
    }

    /// Every request in arrival order, repeats included
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Distinct URLs requested, sorted
    pub fn requested_urls(&self) -> Vec<String> {
        let mut urls = self.requests.lock().unwrap().clone();
        urls.sort();
        urls.dedup();
        urls
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str, _proxy: Option<&str>) -> Result<String, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        self.pages.get(url).cloned().ok_or(FetchError::Status {
            status: 502,
            url: url.to_string(),
        })
    }
}

/// Sink that only remembers what it was asked to send
#[derive(Default)]
pub struct CapturingSink {
    pub messages: Mutex<Vec<String>>,
}

#[async_trait]
impl NotificationSink for CapturingSink {
    async fn notify(&self, _topic: &str, message: &str) -> Result<DeliveryReport, NotifyError> {
        self.messages.lock().unwrap().push(message.to_string());
        Ok(DeliveryReport::default())
    }
}
