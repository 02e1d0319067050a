//! URL handling for the crawl driver
//!
//! Domain extraction and the allowed-domain (offsite) check applied to
//! next-page references before they are followed.

mod domain;
mod matcher;

use crate::config::SpiderConfig;
use crate::{UrlError, UrlResult};
use ::url::Url;

pub use domain::extract_domain;
pub use matcher::matches_allowed_domain;

/// Returns true if the URL may be fetched under the spider's allowed domains
///
/// An empty allowed-domain list places no restriction. URLs without a host
/// (e.g. `data:`) are never allowed when a restriction is configured.
pub fn is_allowed(url: &Url, spider: &SpiderConfig) -> bool {
    if spider.allowed_domains.is_empty() {
        return true;
    }

    match extract_domain(url) {
        Some(host) => spider
            .allowed_domains
            .iter()
            .any(|allowed| matches_allowed_domain(allowed, &host)),
        None => false,
    }
}

/// Parses a URL that will be requested, requiring an HTTP(S) scheme and a host
pub fn parse_request_url(raw: &str) -> UrlResult<Url> {
    let url = Url::parse(raw).map_err(|e| UrlError::Invalid {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(UrlError::InvalidScheme(other.to_string())),
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    Ok(url)
}
