use crate::config::types::{
    Config, FetcherConfig, NotificationConfig, ParserConfig, ScrapeConfig, StorageBackend,
    StorageConfig,
};
use crate::{ConfigError, ConfigResult};
use scraper::Selector;
use url::Url;

/// Placeholder substituted with the page number in `url-template`
pub const PAGE_PLACEHOLDER: &str = "{}";

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_scrape_config(&config.scrape)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_storage_config(&config.storage)?;
    validate_notification_config(&config.notifications)?;
    validate_parser_config(&config.parser)?;
    Ok(())
}

fn validate_scrape_config(config: &ScrapeConfig) -> ConfigResult<()> {
    validate_url_template(&config.url_template)?;

    if config.retry_attempts < 1 || config.retry_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "retry_attempts must be between 1 and 10, got {}",
            config.retry_attempts
        )));
    }

    if config.max_page_span > 1000 {
        return Err(ConfigError::Validation(format!(
            "max_page_span must be <= 1000, got {}",
            config.max_page_span
        )));
    }

    if config.notify_topic.trim().is_empty() {
        return Err(ConfigError::Validation(
            "notify_topic cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Checks that the template has exactly one placeholder and forms an http(s) URL
fn validate_url_template(template: &str) -> ConfigResult<()> {
    let placeholders = template.matches(PAGE_PLACEHOLDER).count();
    if placeholders != 1 {
        return Err(ConfigError::Validation(format!(
            "url_template must contain exactly one '{}' placeholder, found {} in '{}'",
            PAGE_PLACEHOLDER, placeholders, template
        )));
    }

    let sample = template.replace(PAGE_PLACEHOLDER, "1");
    let url = Url::parse(&sample).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid url_template '{}': {}", template, e))
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl(format!(
            "url_template '{}' must use http or https",
            template
        )));
    }

    Ok(())
}

fn validate_fetcher_config(config: &FetcherConfig) -> ConfigResult<()> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    Ok(())
}

/// Each JSON collection needs a file of its own
fn validate_storage_config(config: &StorageConfig) -> ConfigResult<()> {
    if config.backend != StorageBackend::Json {
        return Ok(());
    }

    let products = config.data_dir.join(config.products_file.trim());
    let subscriptions = config.data_dir.join(config.subscriptions_file.trim());
    if products == subscriptions {
        return Err(ConfigError::Validation(format!(
            "products_file and subscriptions_file must differ, both are '{}'",
            products.display()
        )));
    }

    Ok(())
}

fn validate_notification_config(config: &NotificationConfig) -> ConfigResult<()> {
    if config.fallback_recipient.trim().is_empty() {
        return Err(ConfigError::Validation(
            "fallback_recipient cannot be empty".to_string(),
        ));
    }

    if let Some(webhook) = &config.webhook_url {
        Url::parse(webhook)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid webhook_url: {}", e)))?;
    }

    Ok(())
}

fn validate_parser_config(config: &ParserConfig) -> ConfigResult<()> {
    for (name, selector) in [
        ("page_title", &config.page_title),
        ("product_container", &config.product_container),
        ("product_title", &config.product_title),
        ("product_price", &config.product_price),
        ("image", &config.image),
    ] {
        if Selector::parse(selector).is_err() {
            return Err(ConfigError::Validation(format!(
                "{} is not a valid CSS selector: '{}'",
                name, selector
            )));
        }
    }
    Ok(())
}
