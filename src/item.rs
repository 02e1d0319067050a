//! Scraped product records and their document identifier
//!
//! A [`RawItem`] is built once per product element on a listing page and is
//! handed by value to the persistence step. Its identifier is the SHA-256 of
//! the url string exactly as scraped: no normalization of scheme, trailing
//! slash, query or case is applied, so cosmetically different urls for the
//! same product are stored as distinct documents.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Names of the fields a [`RawItem`] carries, in document order
pub const FIELD_NAMES: [&str; 3] = ["url", "title", "price"];

/// One scraped product record
///
/// Every field is optional: a selector that finds nothing yields `None`
/// rather than discarding the record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawItem {
    /// Product page link, absolute or relative, as found in the markup
    pub url: Option<String>,

    /// Display title
    pub title: Option<String>,

    /// Display price including currency formatting
    pub price: Option<String>,
}

impl RawItem {
    /// Returns the document identifier, or `None` when the url is missing
    pub fn identifier(&self) -> Option<String> {
        self.url.as_deref().map(compute_identifier)
    }

    /// Returns the value of a field by name
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            "url" => self.url.as_deref(),
            "title" => self.title.as_deref(),
            "price" => self.price.as_deref(),
            _ => None,
        }
    }

    /// Flattens the record into a document field mapping
    ///
    /// Missing values are written as JSON `null` so a re-crawl that loses a
    /// field overwrites the stale stored value.
    pub fn to_fields(&self) -> Map<String, Value> {
        FIELD_NAMES
            .iter()
            .map(|name| {
                let value = self
                    .field(name)
                    .map_or(Value::Null, |v| Value::String(v.to_string()));
                (name.to_string(), value)
            })
            .collect()
    }
}

/// Computes the document identifier for a product url
///
/// Lowercase hex SHA-256 of the url's UTF-8 bytes.
///
/// # Examples
///
/// ```
/// use comics_crawler::compute_identifier;
///
/// let id = compute_identifier("/a");
/// assert_eq!(id.len(), 64);
/// assert_eq!(id, compute_identifier("/a"));
/// assert_ne!(id, compute_identifier("/a/"));
/// ```
pub fn compute_identifier(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
