//! Crawler module for listing page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching and failure classification
//! - Product and next-page extraction from listing pages
//! - The pagination-walking coordinator
//! - Self-check contracts and per-run statistics

mod contracts;
mod coordinator;
mod extractor;
mod fetcher;
mod stats;


pub use contracts::{check_contracts, contract_url, evaluate, ContractReport, ContractViolation};
pub use coordinator::{run_crawl, Coordinator};
pub use extractor::{extract, extract_items, find_next_page, Page, PageExtraction};
pub use fetcher::{build_http_client, fetch_page, format_user_agent, FetchFailure, FetchedPage};
pub use stats::CrawlStats;
