//! Crawler coordinator - main crawl orchestration logic
//!
//! The coordinator owns the HTTP client and the persister for one run and
//! walks each start URL's pagination chain in turn:
//! - fetch the page
//! - extract its products and next-page reference
//! - persist every product
//! - follow the next page, if it is allowed and not yet fetched
//!
//! A failed fetch ends only its own chain. A store failure ends the run.

use crate::config::Config;
use crate::crawler::extractor::{extract, Page};
use crate::crawler::fetcher::{build_http_client, fetch_page, FetchFailure};
use crate::crawler::stats::CrawlStats;
use crate::pipeline::Persister;
use crate::storage::{DocumentStore, SqliteDocumentStore};
use crate::url::{is_allowed, parse_request_url};
use crate::CrawlError;
use reqwest::Client;
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

/// Main crawler coordinator structure
pub struct Coordinator<S: DocumentStore = SqliteDocumentStore> {
    config: Config,
    client: Client,
    persister: Persister<S>,
    fetched_pages: HashSet<String>,
    stats: CrawlStats,
}

impl Coordinator<SqliteDocumentStore> {
    /// Creates a coordinator, connecting to the configured document store
    ///
    /// Fails if the HTTP client cannot be built or the store cannot be
    /// opened; nothing is fetched in that case.
    pub fn new(config: Config) -> Result<Self, CrawlError> {
        let client = build_http_client(&config.user_agent, &config.crawler)?;
        let persister = Persister::open(&config.store)?;
        Ok(Self::with_persister(config, client, persister))
    }
}

impl<S: DocumentStore> Coordinator<S> {
    /// Creates a coordinator around an already opened persister
    pub fn with_persister(config: Config, client: Client, persister: Persister<S>) -> Self {
        Self {
            config,
            client,
            persister,
            fetched_pages: HashSet::new(),
            stats: CrawlStats::new(),
        }
    }

    /// Runs the crawl to completion and releases the store connection
    ///
    /// On a store error the run stops at once; the persister is dropped with
    /// the coordinator, which releases the connection.
    pub async fn run(mut self) -> Result<CrawlStats, CrawlError> {
        tracing::info!("Spider {} opened", self.config.spider.name);

        let start_urls = self.config.spider.start_urls.clone();
        for raw in &start_urls {
            let start = parse_request_url(raw)?;
            self.crawl_chain(start).await?;
        }

        let Self {
            config,
            persister,
            mut stats,
            ..
        } = self;

        stats.finish(persister.stats());
        persister.close()?;
        stats.log_summary(&config.spider.name);

        Ok(stats)
    }

    /// Walks one pagination chain until it runs out of next pages
    async fn crawl_chain(&mut self, start: Url) -> Result<(), CrawlError> {
        let mut next = Some(start);
        let mut following = false;

        while let Some(url) = next.take() {
            if self.page_limit_reached() {
                tracing::info!("Page limit reached, not fetching {}", url);
                break;
            }

            if !self.remember(&url) {
                break;
            }
            if following {
                self.stats.next_pages_followed += 1;
            }

            self.wait_between_requests().await;
            self.stats.pages_requested += 1;

            let fetched = match fetch_page(&self.client, &url).await {
                Ok(fetched) => fetched,
                Err(failure) => {
                    self.on_fetch_failure(&failure);
                    break;
                }
            };
            self.stats.pages_fetched += 1;

            if fetched.url != url && !self.remember(&fetched.url) {
                break;
            }

            let extraction = {
                let page = Page::from_fetched(&fetched);
                extract(&page)
            };
            self.stats.items_scraped += extraction.items.len() as u64;

            for item in extraction.items {
                self.persister.persist(item)?;
            }

            next = extraction.next_page.and_then(|url| self.admit(url));
            following = true;
        }

        Ok(())
    }

    /// Records a page URL as seen; false if it was already seen this run
    fn remember(&mut self, url: &Url) -> bool {
        if self.fetched_pages.insert(url.to_string()) {
            return true;
        }

        tracing::debug!("Filtered duplicate request to {}", url);
        self.stats.duplicates_filtered += 1;
        false
    }

    /// Receives every fetch failure; the chain it belongs to ends here
    fn on_fetch_failure(&mut self, failure: &FetchFailure) {
        self.stats.fetch_failures += 1;
        tracing::error!("{:?}", failure);
    }

    /// Applies the allowed-domain filter to a next-page reference
    fn admit(&mut self, url: Url) -> Option<Url> {
        if !is_allowed(&url, &self.config.spider) {
            tracing::debug!("Filtered offsite request to {}", url);
            self.stats.offsite_filtered += 1;
            return None;
        }

        Some(url)
    }

    fn page_limit_reached(&self) -> bool {
        self.config
            .crawler
            .max_pages
            .map_or(false, |max| self.stats.pages_requested >= u64::from(max))
    }

    /// Sleeps for the download delay, except before the first request
    async fn wait_between_requests(&self) {
        let delay = self.config.crawler.download_delay;
        if delay > 0 && self.stats.pages_requested > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }
}

/// Runs a complete crawl with the given configuration
///
/// # Example
///
/// ```no_run
/// use comics_crawler::config::load_config;
/// use comics_crawler::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("comics.toml"))?;
/// let stats = run_crawl(config).await?;
/// println!("{} items scraped", stats.items_scraped);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config) -> Result<CrawlStats, CrawlError> {
    Coordinator::new(config)?.run().await
}
