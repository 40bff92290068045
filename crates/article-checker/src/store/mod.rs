//! Keyed record persistence.
//!
//! A store maps hashed keys to fixed-shape records. Two backends implement the
//! same contract:
//! - [`GistStore`]: a CSV file inside a GitHub Gist (remote, durable)
//! - [`LocalFileStore`]: a JSON file in the cache directory (fallback)
//!
//! Swapping backends changes durability, never cache semantics.

mod gist;
mod local;
pub mod tabular;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StoreResult;

pub use gist::GistStore;
pub use local::LocalFileStore;
pub use tabular::Row;

/// In-memory index from cache key to record.
pub type RecordMap<R> = HashMap<String, R>;

/// A record with a fixed ordered column schema. The first column is the natural key.
pub trait TabularRecord: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Column names in order.
    const COLUMNS: &'static [&'static str];

    /// Value of the first column.
    fn natural_key(&self) -> &str;

    /// Hashed key used in the in-memory index.
    fn cache_key(&self) -> String;

    /// Timestamp used for expiry and for ordering rows on save.
    fn timestamp(&self) -> DateTime<Utc>;

    /// Cells in `COLUMNS` order.
    fn to_row(&self) -> Vec<String>;

    /// Build from a parsed row; `None` when the natural key is empty.
    fn from_row(row: &Row) -> Option<Self>;
}

/// Persistence backend for one logical cache.
#[async_trait::async_trait]
pub trait KeyedRecordStore<R: TabularRecord>: Send + Sync {
    /// Where the records live, for logs.
    fn describe(&self) -> String;

    /// Read every record. A missing document is an empty map, not an error.
    async fn load(&self) -> StoreResult<RecordMap<R>>;

    /// Replace the stored document with `records`.
    async fn save(&self, records: &RecordMap<R>) -> StoreResult<()>;
}

/// Index records by their own cache key, dropping rows without a natural key.
pub fn index_records<R: TabularRecord>(records: impl IntoIterator<Item = R>) -> RecordMap<R> {
    records
        .into_iter()
        .filter(|r| !r.natural_key().trim().is_empty())
        .map(|r| (r.cache_key(), r))
        .collect()
}

/// Records ordered by timestamp, then natural key, for deterministic output.
#[must_use]
pub fn ordered_records<R: TabularRecord>(records: &RecordMap<R>) -> Vec<&R> {
    let mut rows: Vec<&R> = records.values().collect();
    rows.sort_by(|a, b| {
        a.timestamp().cmp(&b.timestamp()).then_with(|| a.natural_key().cmp(b.natural_key()))
    });
    rows
}
