//! Per-run crawl counters

use crate::pipeline::PersistStats;
use chrono::{DateTime, Duration, Utc};

/// Counters collected over one crawl run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlStats {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    /// Fetches attempted, successful or not
    pub pages_requested: u64,
    /// Fetches that returned a page
    pub pages_fetched: u64,
    /// Fetches that ended a pagination branch
    pub fetch_failures: u64,

    /// Records extracted across all pages
    pub items_scraped: u64,
    pub items_inserted: u64,
    pub items_updated: u64,
    pub items_dropped: u64,

    pub next_pages_followed: u64,
    /// Next-page references outside the allowed domains
    pub offsite_filtered: u64,
    /// Next-page references to a page already fetched this run
    pub duplicates_filtered: u64,
}

impl CrawlStats {
    /// Starts a new set of counters stamped with the current time
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            pages_requested: 0,
            pages_fetched: 0,
            fetch_failures: 0,
            items_scraped: 0,
            items_inserted: 0,
            items_updated: 0,
            items_dropped: 0,
            next_pages_followed: 0,
            offsite_filtered: 0,
            duplicates_filtered: 0,
        }
    }

    /// Stamps the finish time and folds in the persister's counters
    pub fn finish(&mut self, persisted: PersistStats) {
        self.items_inserted = persisted.inserted;
        self.items_updated = persisted.updated;
        self.items_dropped = persisted.dropped;
        self.finished_at = Some(Utc::now());
    }

    /// Run duration, once finished
    pub fn elapsed(&self) -> Option<Duration> {
        self.finished_at.map(|finished| finished - self.started_at)
    }

    /// Logs the run summary
    pub fn log_summary(&self, spider: &str) {
        let elapsed_ms = self.elapsed().map_or(0, |d| d.num_milliseconds());

        tracing::info!(
            "Spider {} closed after {}ms: {} pages fetched, {} failed, {} items scraped ({} inserted, {} updated, {} dropped)",
            spider,
            elapsed_ms,
            self.pages_fetched,
            self.fetch_failures,
            self.items_scraped,
            self.items_inserted,
            self.items_updated,
            self.items_dropped
        );

        if self.offsite_filtered > 0 || self.duplicates_filtered > 0 {
            tracing::info!(
                "Filtered {} offsite and {} duplicate page requests",
                self.offsite_filtered,
                self.duplicates_filtered
            );
        }
    }
}

impl Default for CrawlStats {
    fn default() -> Self {
        Self::new()
    }
}
