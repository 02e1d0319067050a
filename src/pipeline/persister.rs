use crate::config::StoreConfig;
use crate::item::RawItem;
use crate::storage::{open_store, DocumentStore, SqliteDocumentStore, StoreResult, UpsertOutcome};

/// Collection every item is written to
pub const COLLECTION_NAME: &str = "comics";

/// Counters for one persister's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistStats {
    /// Items that created a new document
    pub inserted: u64,

    /// Items that updated an existing document
    pub updated: u64,

    /// Items that could not be keyed because their url was missing
    pub dropped: u64,
}

/// Writes scraped items into the document store
///
/// The store connection is acquired once when the persister is opened and
/// released by [`Persister::close`]. Dropping the persister without closing
/// it (e.g. while unwinding a failed crawl) releases the connection too.
pub struct Persister<S: DocumentStore = SqliteDocumentStore> {
    store: S,
    stats: PersistStats,
}

impl Persister<SqliteDocumentStore> {
    /// Connects to the store named in the configuration
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        let store = open_store(config)?;
        tracing::info!(
            "Connected to document store {} (database: {})",
            config.uri,
            config.database
        );
        Ok(Self::with_store(store))
    }
}

impl<S: DocumentStore> Persister<S> {
    /// Wraps an already opened store
    pub fn with_store(store: S) -> Self {
        Self {
            store,
            stats: PersistStats::default(),
        }
    }

    /// Upserts one item and hands it back unchanged
    ///
    /// The document is matched on `_id` = SHA-256 of the url; every item
    /// field overwrites the stored one. Items without a url cannot be keyed
    /// and are dropped with a warning. Store errors are returned to the
    /// caller untouched.
    pub fn persist(&mut self, item: RawItem) -> StoreResult<RawItem> {
        let Some(id) = item.identifier() else {
            tracing::warn!(
                "Dropping item without url (title: {:?}, price: {:?})",
                item.title,
                item.price
            );
            self.stats.dropped += 1;
            return Ok(item);
        };

        match self.store.upsert(COLLECTION_NAME, &id, &item.to_fields())? {
            UpsertOutcome::Inserted => self.stats.inserted += 1,
            UpsertOutcome::Updated => self.stats.updated += 1,
        }

        tracing::trace!("Stored {} as {}", item.url.as_deref().unwrap_or_default(), id);
        Ok(item)
    }

    /// Counters since the persister was opened
    pub fn stats(&self) -> PersistStats {
        self.stats
    }

    /// Read access to the underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Releases the store connection
    pub fn close(self) -> StoreResult<()> {
        tracing::debug!(
            "Closing document store ({} inserted, {} updated, {} dropped)",
            self.stats.inserted,
            self.stats.updated,
            self.stats.dropped
        );
        self.store.close()
    }
}
