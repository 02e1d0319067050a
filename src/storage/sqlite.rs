//! SQLite document store implementation
//!
//! This module provides a SQLite-based implementation of the DocumentStore trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{DocumentStore, StoreError, StoreResult};
use crate::storage::{PersistedDocument, UpsertOutcome, ID_FIELD};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Where a store URI points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// Private in-memory database, gone when the connection closes
    Memory,
    /// Database file on disk
    File(PathBuf),
}

/// Parses a store URI
///
/// Accepted forms are `sqlite::memory:`, `sqlite://<path>` and a bare
/// filesystem path. Any other `scheme://` is rejected.
///
/// # Examples
///
/// ```
/// use comics_crawler::storage::{parse_store_uri, StoreLocation};
/// use std::path::PathBuf;
///
/// assert_eq!(parse_store_uri("sqlite::memory:").unwrap(), StoreLocation::Memory);
/// assert_eq!(
///     parse_store_uri("sqlite://data/comics.db").unwrap(),
///     StoreLocation::File(PathBuf::from("data/comics.db"))
/// );
/// assert!(parse_store_uri("mongodb://localhost:27017").is_err());
/// ```
pub fn parse_store_uri(uri: &str) -> StoreResult<StoreLocation> {
    let trimmed = uri.trim();
    let invalid = |reason: &str| StoreError::InvalidUri {
        uri: uri.to_string(),
        reason: reason.to_string(),
    };

    if trimmed.is_empty() {
        return Err(invalid("empty"));
    }

    if trimmed == "sqlite::memory:" || trimmed == ":memory:" {
        return Ok(StoreLocation::Memory);
    }

    if let Some(path) = trimmed.strip_prefix("sqlite://") {
        if path.is_empty() {
            return Err(invalid("missing database path"));
        }
        return Ok(StoreLocation::File(PathBuf::from(path)));
    }

    if trimmed.contains("://") {
        return Err(invalid("unsupported scheme, expected sqlite://"));
    }

    Ok(StoreLocation::File(PathBuf::from(trimmed)))
}

/// SQLite document store
pub struct SqliteDocumentStore {
    conn: Connection,
    database: String,
}

impl SqliteDocumentStore {
    /// Connects to the store at `uri`, scoping all collections to `database`
    pub fn connect(uri: &str, database: &str) -> StoreResult<Self> {
        match parse_store_uri(uri)? {
            StoreLocation::Memory => Self::open_in_memory(database),
            StoreLocation::File(path) => {
                let conn = Connection::open(&path)?;

                conn.execute_batch(
                    "
                    PRAGMA journal_mode = WAL;
                    PRAGMA synchronous = NORMAL;
                    PRAGMA temp_store = MEMORY;
                ",
                )?;

                initialize_schema(&conn)?;

                tracing::debug!("Opened document store at {}", path.display());

                Ok(Self {
                    conn,
                    database: database.to_string(),
                })
            }
        }
    }

    /// Creates an in-memory store
    pub fn open_in_memory(database: &str) -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn,
            database: database.to_string(),
        })
    }

    /// The database name this store is scoped to
    pub fn database(&self) -> &str {
        &self.database
    }
}

/// Parses a stored body into a JSON object
fn parse_body(collection: &str, id: &str, body: &str) -> StoreResult<Map<String, Value>> {
    match serde_json::from_str(body)? {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::CorruptDocument {
            collection: collection.to_string(),
            id: id.to_string(),
        }),
    }
}

impl DocumentStore for SqliteDocumentStore {
    fn upsert(
        &mut self,
        collection: &str,
        id: &str,
        fields: &Map<String, Value>,
    ) -> StoreResult<UpsertOutcome> {
        let tx = self.conn.transaction()?;

        let existing: Option<String> = tx
            .query_row(
                "SELECT body FROM documents WHERE db_name = ?1 AND collection = ?2 AND id = ?3",
                params![self.database, collection, id],
                |row| row.get(0),
            )
            .optional()?;

        let outcome = match existing {
            Some(body) => {
                let mut document = parse_body(collection, id, &body)?;
                for (key, value) in fields {
                    document.insert(key.clone(), value.clone());
                }
                document.insert(ID_FIELD.to_string(), Value::String(id.to_string()));

                tx.execute(
                    "UPDATE documents SET body = ?1 WHERE db_name = ?2 AND collection = ?3 AND id = ?4",
                    params![
                        serde_json::to_string(&document)?,
                        self.database,
                        collection,
                        id
                    ],
                )?;
                UpsertOutcome::Updated
            }
            None => {
                let mut document = fields.clone();
                document.insert(ID_FIELD.to_string(), Value::String(id.to_string()));

                tx.execute(
                    "INSERT INTO documents (db_name, collection, id, body) VALUES (?1, ?2, ?3, ?4)",
                    params![
                        self.database,
                        collection,
                        id,
                        serde_json::to_string(&document)?
                    ],
                )?;
                UpsertOutcome::Inserted
            }
        };

        tx.commit()?;
        Ok(outcome)
    }

    fn find_by_id(&self, collection: &str, id: &str) -> StoreResult<Option<PersistedDocument>> {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM documents WHERE db_name = ?1 AND collection = ?2 AND id = ?3",
                params![self.database, collection, id],
                |row| row.get(0),
            )
            .optional()?;

        body.map(|body| {
            parse_body(collection, id, &body).map(|map| PersistedDocument::from_body(id, map))
        })
        .transpose()
    }

    fn count(&self, collection: &str) -> StoreResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE db_name = ?1 AND collection = ?2",
            params![self.database, collection],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn close(self) -> StoreResult<()> {
        self.conn.close().map_err(|(_, e)| StoreError::Sqlite(e))
    }
}
