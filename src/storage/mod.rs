//! Storage module for persisting scraped items
//!
//! Items land in a keyed document store: collections of JSON documents
//! addressed by `_id`, written with insert-or-update semantics. The store is
//! backed by SQLite; a database name namespaces collections inside one file.

mod schema;
mod sqlite;
mod traits;

pub use sqlite::{parse_store_uri, SqliteDocumentStore, StoreLocation};
pub use traits::{DocumentStore, StoreError, StoreResult};

use crate::config::StoreConfig;
use serde_json::{Map, Value};

/// Field that carries the document identifier inside a stored body
pub const ID_FIELD: &str = "_id";

/// Opens the document store described by the configuration
pub fn open_store(config: &StoreConfig) -> StoreResult<SqliteDocumentStore> {
    SqliteDocumentStore::connect(&config.uri, &config.database)
}

/// Whether an upsert created or updated a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// A document as read back from the store
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedDocument {
    /// The document identifier
    pub id: String,

    /// Every stored field except `_id`
    pub fields: Map<String, Value>,
}

impl PersistedDocument {
    /// Builds a document from a stored body, splitting off `_id`
    pub(crate) fn from_body(id: &str, mut body: Map<String, Value>) -> Self {
        body.remove(ID_FIELD);
        Self {
            id: id.to_string(),
            fields: body,
        }
    }

    /// Returns a string field, or `None` when it is missing, null, or not a string
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Returns true if the field is present and explicitly null
    pub fn is_null(&self, name: &str) -> bool {
        matches!(self.fields.get(name), Some(Value::Null))
    }
}
