//! Persistence port for cache records.

use async_trait::async_trait;

use crate::application::cache::CacheRecord;
use crate::error::Result;

/// Durable storage for [`CacheRecord`]s, one record per logical key.
///
/// Saving replaces the whole record; implementations must never leave a
/// partially written record behind.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Load the record stored under `key`, if any.
    async fn load(&self, key: &str) -> Result<Option<CacheRecord>>;

    /// Save a record, replacing any previous record for the same key.
    async fn save(&self, record: &CacheRecord) -> Result<()>;

    /// Remove a record. Returns whether one existed.
    async fn remove(&self, key: &str) -> Result<bool>;

    /// Keys of every stored record.
    async fn keys(&self) -> Result<Vec<String>>;
}
