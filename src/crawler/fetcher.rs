//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler:
//! - Building the HTTP client with the configured user agent and timeouts
//! - GET requests for listing pages (redirects followed)
//! - Classifying failures into an opaque [`FetchFailure`]

use crate::config::{CrawlerConfig, UserAgentConfig};
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Maximum number of redirects followed for one page
const MAX_REDIRECTS: usize = 10;

/// A successfully fetched listing page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: Url,

    /// HTTP status code (always 2xx)
    pub status: u16,

    /// Page body
    pub body: String,
}

/// Why a page could not be fetched
///
/// The crawl driver does not inspect this beyond logging it; its `Debug`
/// form is what ends up in the error log.
#[derive(Debug, Error)]
pub enum FetchFailure {
    /// The server answered with a non-2xx status
    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    /// The request did not complete within the timeout
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    /// The connection could not be established
    #[error("Connection failed for {url}: {message}")]
    Connect { url: String, message: String },

    /// The response body could not be read
    #[error("Failed to read body of {url}: {message}")]
    Body { url: String, message: String },

    /// Any other request error (redirect limit, invalid response, ...)
    #[error("Request to {url} failed: {message}")]
    Request { url: String, message: String },
}

impl FetchFailure {
    /// The URL that was being fetched
    pub fn url(&self) -> &str {
        match self {
            Self::HttpStatus { url, .. }
            | Self::Timeout { url }
            | Self::Connect { url, .. }
            | Self::Body { url, .. }
            | Self::Request { url, .. } => url,
        }
    }
}

/// Formats the user agent string: `Name/Version (+ContactURL; ContactEmail)`
pub fn format_user_agent(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use comics_crawler::config::{CrawlerConfig, UserAgentConfig};
/// use comics_crawler::crawler::build_http_client;
///
/// let user_agent = UserAgentConfig {
///     crawler_name: "ComicsCrawler".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&user_agent, &CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    crawler: &CrawlerConfig,
) -> Result<Client, reqwest::Error> {
    let timeout = Duration::from_secs(crawler.request_timeout);

    Client::builder()
        .user_agent(format_user_agent(user_agent))
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches one page
///
/// Any non-2xx final status is a failure, as are timeouts, connection
/// errors, redirect overflows, and unreadable bodies. No retries are made.
pub async fn fetch_page(client: &Client, url: &Url) -> Result<FetchedPage, FetchFailure> {
    tracing::debug!("Fetching {}", url);

    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| classify_error(url, e))?;

    let status = response.status();
    let final_url = response.url().clone();

    if !status.is_success() {
        return Err(FetchFailure::HttpStatus {
            url: final_url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response.text().await.map_err(|e| FetchFailure::Body {
        url: final_url.to_string(),
        message: e.to_string(),
    })?;

    Ok(FetchedPage {
        url: final_url,
        status: status.as_u16(),
        body,
    })
}

/// Maps a reqwest send error onto a failure kind
fn classify_error(url: &Url, error: reqwest::Error) -> FetchFailure {
    let url = url.to_string();

    if error.is_timeout() {
        FetchFailure::Timeout { url }
    } else if error.is_connect() {
        FetchFailure::Connect {
            url,
            message: error.to_string(),
        }
    } else {
        FetchFailure::Request {
            url,
            message: error.to_string(),
        }
    }
}
