//! Item pipeline
//!
//! The single pipeline stage keys each scraped item by the hash of its url
//! and upserts it into the document store, so re-crawling the same listing
//! updates existing documents in place.

mod persister;

pub use persister::{PersistStats, Persister, COLLECTION_NAME};
