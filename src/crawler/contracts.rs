//! Self-check contracts for the listing extractor
//!
//! A contract fetches one listing page and asserts what extraction yields:
//! the number of items and follow-up requests falls inside configured
//! bounds, and every item carries the configured fields. Running the check
//! against the live site is the quickest way to notice a theme change that
//! broke the selectors.

use crate::config::{Config, ContractConfig};
use crate::crawler::extractor::{extract, Page, PageExtraction};
use crate::crawler::fetcher::fetch_page;
use crate::url::parse_request_url;
use crate::CrawlError;
use reqwest::Client;
use serde_json::Value;
use std::fmt;
use url::Url;

/// One unmet expectation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractViolation {
    /// Item count outside the inclusive bounds
    ItemCount { found: u32, min: u32, max: u32 },

    /// Follow-up request count outside the inclusive bounds
    RequestCount { found: u32, min: u32, max: u32 },

    /// An item lacks a value for a required field
    MissingField { item: usize, field: String },
}

impl fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ItemCount { found, min, max } => {
                write!(f, "returned {} items, expected {}..{}", found, min, max)
            }
            Self::RequestCount { found, min, max } => {
                write!(f, "returned {} requests, expected {}..{}", found, min, max)
            }
            Self::MissingField { item, field } => {
                write!(f, "item #{} is missing field '{}'", item, field)
            }
        }
    }
}

/// Outcome of checking one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractReport {
    pub url: Url,
    pub items: u32,
    pub requests: u32,
    pub violations: Vec<ContractViolation>,
}

impl ContractReport {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

/// The page a contract runs against: its own URL, else the first start URL
pub fn contract_url(config: &Config) -> Result<Url, CrawlError> {
    let raw = config
        .contract
        .url
        .as_deref()
        .or_else(|| config.spider.start_urls.first().map(String::as_str))
        .ok_or_else(|| {
            crate::ConfigError::Validation("no contract URL or start URL configured".to_string())
        })?;

    Ok(parse_request_url(raw)?)
}

/// Checks an extraction against a contract
///
/// A field counts as scraped when the item's document mapping carries it,
/// null included; with `require_values` it must also hold a value. The
/// request count is the number of follow-up pages the extraction asks for,
/// before any offsite filtering.
pub fn evaluate(url: Url, extraction: &PageExtraction, contract: &ContractConfig) -> ContractReport {
    let items = extraction.items.len() as u32;
    let requests = u32::from(extraction.next_page.is_some());
    let mut violations = Vec::new();

    let [min, max] = contract.items;
    if items < min || items > max {
        violations.push(ContractViolation::ItemCount {
            found: items,
            min,
            max,
        });
    }

    let [min, max] = contract.requests;
    if requests < min || requests > max {
        violations.push(ContractViolation::RequestCount {
            found: requests,
            min,
            max,
        });
    }

    for (index, item) in extraction.items.iter().enumerate() {
        let fields = item.to_fields();
        for field in &contract.scrapes {
            let scraped = match fields.get(field) {
                Some(Value::Null) => !contract.require_values,
                Some(_) => true,
                None => false,
            };
            if !scraped {
                violations.push(ContractViolation::MissingField {
                    item: index,
                    field: field.clone(),
                });
            }
        }
    }

    ContractReport {
        url,
        items,
        requests,
        violations,
    }
}

/// Fetches the contract page and evaluates it
pub async fn check_contracts(client: &Client, config: &Config) -> Result<ContractReport, CrawlError> {
    let url = contract_url(config)?;
    let fetched = fetch_page(client, &url).await?;

    let extraction = {
        let page = Page::from_fetched(&fetched);
        extract(&page)
    };

    let report = evaluate(url, &extraction, &config.contract);
    for violation in &report.violations {
        tracing::warn!("Contract failed for {}: {}", report.url, violation);
    }

    Ok(report)
}
