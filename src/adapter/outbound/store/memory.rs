//! In-memory record store for tests and ephemeral gateways.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::application::cache::CacheRecord;
use crate::error::{Error, Result};
use crate::port::RecordStore;

/// Record store backed by a map. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<HashMap<String, CacheRecord>>,
    fail_writes: AtomicBool,
}

impl MemoryRecordStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later `save` fail, simulating an unavailable disk.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn load(&self, key: &str) -> Result<Option<CacheRecord>> {
        Ok(self.records.read().get(key).cloned())
    }

    async fn save(&self, record: &CacheRecord) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "store is read-only",
            )));
        }
        self.records
            .write()
            .insert(record.key.clone(), record.clone());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.records.write().remove(key).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.records.read().keys().cloned().collect())
    }
}
