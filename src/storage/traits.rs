//! Storage traits and error types
//!
//! This module defines the document store interface the persister writes
//! through, and the errors it can return.

use crate::storage::{PersistedDocument, UpsertOutcome};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid store URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("Document '{id}' in collection '{collection}' is not a JSON object")]
    CorruptDocument { collection: String, id: String },
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// A keyed document store
///
/// Documents are untyped JSON objects grouped into named collections and
/// addressed by a string `_id`.
pub trait DocumentStore {
    /// Inserts or updates the document with the given id
    ///
    /// Each given field overwrites the same-named field of an existing
    /// document; fields not named are kept. A missing document is created
    /// holding `_id` plus the given fields.
    fn upsert(
        &mut self,
        collection: &str,
        id: &str,
        fields: &Map<String, Value>,
    ) -> StoreResult<UpsertOutcome>;

    /// Looks a document up by id
    fn find_by_id(&self, collection: &str, id: &str) -> StoreResult<Option<PersistedDocument>>;

    /// Counts the documents in a collection
    fn count(&self, collection: &str) -> StoreResult<u64>;

    /// Releases the underlying connection
    fn close(self) -> StoreResult<()>
    where
        Self: Sized;
}
