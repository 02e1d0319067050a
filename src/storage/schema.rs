//! Database schema for the document store

/// SQL schema for the document table
///
/// `db_name` and `collection` namespace the documents; `body` holds the
/// whole document, `_id` included, as a JSON object.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    db_name TEXT NOT NULL,
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    body TEXT NOT NULL,
    PRIMARY KEY (db_name, collection, id)
);

CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(db_name, collection);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
