//! Listing-Harvest main entry point
//!
//! This is the command-line interface for the Listing-Harvest scraper.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use listing_harvest::config::{load_config_with_hash, Config};
use listing_harvest::notify::{build_delivery, NotificationManager};
use listing_harvest::repository::{ProductRepository, SubscriptionRepository};
use listing_harvest::scrape::{
    HttpFetcher, PageFetcher, ProductListParser, ScrapeOrchestrator, ScrapeRequest,
};
use listing_harvest::storage::open_storages;
use listing_harvest::{HarvestError, Product};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Listing-Harvest: a paginated product listing scraper
///
/// Listing-Harvest fetches a range of shop listing pages, stores every
/// product it has not seen before and notifies the subscribers of the
/// configured topic.
#[derive(Parser, Debug)]
#[command(name = "listing-harvest")]
#[command(version)]
#[command(about = "A paginated product listing scraper", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG", default_value = "harvest.toml", global = true)]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape a range of listing pages
    Scrape {
        /// First page to scrape
        #[arg(long, default_value_t = 1)]
        from_page: u32,

        /// Last page to scrape (ignored when --pages is given)
        #[arg(long)]
        to_page: Option<u32>,

        /// Number of pages to scrape, starting at --from-page
        #[arg(long = "pages")]
        page_count: Option<u32>,

        /// Proxy URL used for every request
        #[arg(long)]
        proxy: Option<String>,
    },

    /// Subscribe a user to a topic
    Subscribe {
        #[arg(long)]
        topic: String,

        #[arg(long)]
        user: String,
    },

    /// Subscribe several users to one topic
    SubscribeMany {
        #[arg(long)]
        topic: String,

        #[arg(required = true)]
        users: Vec<String>,
    },

    /// Remove a user's subscription to a topic
    Unsubscribe {
        #[arg(long)]
        topic: String,

        #[arg(long)]
        user: String,
    },

    /// List the subscribers of a topic
    Subscribers {
        #[arg(long)]
        topic: String,
    },

    /// List stored products, or show one by id
    Products { id: Option<String> },

    /// Validate the configuration and exit
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    match cli.command {
        Command::Scrape {
            from_page,
            to_page,
            page_count,
            proxy,
        } => {
            handle_scrape(
                config,
                ScrapeRequest {
                    from_page,
                    to_page,
                    page_count,
                    proxy,
                },
            )
            .await
        }
        Command::Subscribe { topic, user } => handle_subscribe(&config, &topic, &user).await,
        Command::SubscribeMany { topic, users } => {
            let added = subscriptions(&config)?
                .add_users_to_topic(&topic, &users)
                .await?;
            println!("{} of {} user(s) newly subscribed to '{}'", added, users.len(), topic);
            Ok(())
        }
        Command::Unsubscribe { topic, user } => {
            match subscriptions(&config)?.remove(&topic, &user).await? {
                0 => println!("'{}' was not subscribed to '{}'", user, topic),
                _ => println!("Unsubscribed '{}' from '{}'", user, topic),
            }
            Ok(())
        }
        Command::Subscribers { topic } => {
            for user in subscriptions(&config)?.users_by_topic(&topic).await? {
                println!("{}", user);
            }
            Ok(())
        }
        Command::Products { id } => handle_products(&config, id).await,
        Command::CheckConfig => {
            handle_check_config(&config, &config_hash);
            Ok(())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("listing_harvest=info,warn"),
            1 => EnvFilter::new("listing_harvest=debug,info"),
            2 => EnvFilter::new("listing_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn subscriptions(config: &Config) -> anyhow::Result<SubscriptionRepository> {
    let storages = open_storages(&config.storage).context("Failed to open storage")?;
    Ok(SubscriptionRepository::new(storages.subscriptions))
}

/// Runs one scrape and prints its summary as JSON
async fn handle_scrape(config: Config, request: ScrapeRequest) -> anyhow::Result<()> {
    let storages = open_storages(&config.storage).context("Failed to open storage")?;
    let products = Arc::new(ProductRepository::new(storages.products));
    let subscriptions = Arc::new(SubscriptionRepository::new(storages.subscriptions));

    let delivery = build_delivery(
        &config.notifications,
        Duration::from_secs(config.fetcher.timeout_secs),
    )?;
    let notifier = NotificationManager::new(subscriptions, delivery)
        .with_fallback_recipient(config.notifications.fallback_recipient.clone());

    let fetcher = Arc::new(HttpFetcher::new(config.fetcher.clone()));
    let parser = ProductListParser::new(&config.parser).context("Invalid parser selectors")?;

    tracing::info!("Storing products in {}", products.storage().describe());

    let orchestrator: ScrapeOrchestrator<Product> = ScrapeOrchestrator::new(
        fetcher.clone(),
        Arc::new(parser),
        products,
        Arc::new(notifier),
        config.scrape,
    )
    .with_span(tracing::info_span!("cli"));

    let outcome = orchestrator.scrape(request).await;
    fetcher.close().await;

    let summary = outcome?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn handle_subscribe(config: &Config, topic: &str, user: &str) -> anyhow::Result<()> {
    match subscriptions(config)?.subscribe(topic, user).await {
        Ok(()) => {
            println!("Subscribed '{}' to '{}'", user.trim(), topic.trim());
            Ok(())
        }
        Err(HarvestError::DuplicateSubscription { topic, user }) => {
            bail!("'{}' is already subscribed to '{}'", user, topic)
        }
        Err(e) => Err(e.into()),
    }
}

async fn handle_products(config: &Config, id: Option<String>) -> anyhow::Result<()> {
    let storages = open_storages(&config.storage).context("Failed to open storage")?;
    let products = ProductRepository::new(storages.products);

    match id {
        Some(id) => match products.get(&id).await? {
            Some(product) => println!("{}", serde_json::to_string_pretty(&product)?),
            None => bail!("No product with id '{}'", id),
        },
        None => {
            let all = products.all().await?;
            println!("{}", serde_json::to_string_pretty(&all)?);
        }
    }

    Ok(())
}

/// Prints the effective configuration after validation
fn handle_check_config(config: &Config, config_hash: &str) {
    println!("=== Listing-Harvest Configuration ===\n");

    println!("Scrape:");
    println!("  URL template: {}", config.scrape.url_template);
    println!("  Max page span: {}", config.scrape.max_page_span);
    println!("  Retry attempts: {}", config.scrape.retry_attempts);
    println!("  Backoff base: {}ms", config.scrape.backoff_base_ms);
    match config.scrape.max_backoff_ms {
        0 => println!("  Max backoff: uncapped"),
        cap => println!("  Max backoff: {}ms", cap),
    }
    println!("  Notify topic: {}", config.scrape.notify_topic);

    println!("\nFetcher:");
    println!("  User agent: {}", config.fetcher.user_agent);
    println!("  Timeout: {}s", config.fetcher.timeout_secs);

    println!("\nStorage:");
    println!("  Backend: {:?}", config.storage.backend);
    println!("  Data directory: {}", config.storage.data_dir.display());

    println!("\nNotifications:");
    println!("  Fallback recipient: {}", config.notifications.fallback_recipient);
    match &config.notifications.webhook_url {
        Some(url) => println!("  Webhook: {}", url),
        None => println!("  Webhook: none"),
    }

    println!("\n✓ Configuration is valid (hash: {})", config_hash);
}
