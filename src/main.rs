//! Comics crawler main entry point
//!
//! This is the command-line interface for the comics listing crawler.

use anyhow::{bail, Context, Result};
use clap::Parser;
use comics_crawler::config::{load_config_with_hash, Config};
use comics_crawler::crawler::{build_http_client, check_contracts, run_crawl};
use comics_crawler::pipeline::COLLECTION_NAME;
use comics_crawler::storage::{open_store, DocumentStore};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Comics crawler: scrape a paginated comics listing into a document store
///
/// Walks the listing from each start URL, extracts url, title and price for
/// every product, and upserts each product keyed by the hash of its url.
#[derive(Parser, Debug)]
#[command(name = "comics-crawler")]
#[command(version)]
#[command(about = "Scrape a paginated comics listing into a document store", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with_all = ["stats", "check"])]
    dry_run: bool,

    /// Show how many documents the store holds and exit
    #[arg(long, conflicts_with_all = ["dry_run", "check"])]
    stats: bool,

    /// Fetch the contract page and verify the extractor against it
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.check {
        handle_check(&config).await?;
    } else {
        handle_crawl(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("comics_crawler=info,warn"),
            1 => EnvFilter::new("comics_crawler=debug,info"),
            2 => EnvFilter::new("comics_crawler=trace,debug"),
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

/// Handles --dry-run: prints the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Comics Crawler Dry Run ===\n");

    println!("Spider: {}", config.spider.name);
    println!("\nStart URLs ({}):", config.spider.start_urls.len());
    for url in &config.spider.start_urls {
        println!("  - {}", url);
    }

    if config.spider.allowed_domains.is_empty() {
        println!("\nAllowed domains: any");
    } else {
        println!("\nAllowed domains:");
        for domain in &config.spider.allowed_domains {
            println!("  - {}", domain);
        }
    }

    println!("\nCrawler:");
    println!("  Download delay: {}ms", config.crawler.download_delay);
    println!("  Request timeout: {}s", config.crawler.request_timeout);
    match config.crawler.max_pages {
        Some(max) => println!("  Max pages: {}", max),
        None => println!("  Max pages: unlimited"),
    }

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nStore:");
    println!("  URI: {}", config.store.uri);
    println!("  Database: {}", config.store.database);
    println!("  Collection: {}", COLLECTION_NAME);

    println!("\n✓ Configuration is valid");
}

/// Handles --stats: prints the stored document count
fn handle_stats(config: &Config) -> Result<()> {
    let store = open_store(&config.store).context("failed to open document store")?;
    let count = store.count(COLLECTION_NAME)?;

    println!("Store: {} (database: {})", config.store.uri, config.store.database);
    println!("Documents in '{}': {}", COLLECTION_NAME, count);

    store.close()?;
    Ok(())
}

/// Handles --check: runs the extractor contract against the live page
async fn handle_check(config: &Config) -> Result<()> {
    let client = build_http_client(&config.user_agent, &config.crawler)?;
    let report = check_contracts(&client, config).await?;

    println!("Contract page: {}", report.url);
    println!("  Items: {}", report.items);
    println!("  Requests: {}", report.requests);

    if report.passed() {
        println!("\n✓ All contracts passed");
        return Ok(());
    }

    println!("\nViolations:");
    for violation in &report.violations {
        println!("  ✗ {}", violation);
    }
    bail!("{} contract violation(s)", report.violations.len())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> Result<()> {
    tracing::info!(
        "Crawling {} start URL(s) into {} (database: {})",
        config.spider.start_urls.len(),
        config.store.uri,
        config.store.database
    );

    match run_crawl(config).await {
        Ok(stats) => {
            tracing::info!(
                "Crawl completed: {} items from {} pages",
                stats.items_scraped,
                stats.pages_fetched
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
