//! TTL cache over a durable [`RecordStore`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::record::{CacheEntryInfo, CacheRecord};
use crate::application::singleflight::{KeyGuard, KeyedLocks};
use crate::error::Result;
use crate::port::{Clock, RecordStore};

#[derive(Debug, Clone)]
struct ShadowEntry {
    record: CacheRecord,
    generation: u64,
}

/// Read-through cache keyed by logical dataset key.
///
/// Records live in a [`RecordStore`] so they survive restarts; an in-memory
/// shadow avoids re-reading them within one process. Concurrent callers for
/// the same key wait for the first fetch instead of racing it.
pub struct EntityCache {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    shadow: RwLock<HashMap<String, ShadowEntry>>,
    generation: AtomicU64,
    locks: KeyedLocks<String>,
}

impl EntityCache {
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            shadow: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(0),
            locks: KeyedLocks::new(),
        }
    }

    /// Return the payload for `key`, fetching it when missing, stale or forced.
    ///
    /// `fetch` yields `Ok(None)` when the remote API has no such entity;
    /// that answer is passed through and not cached. When `fetch` fails and
    /// the call is not forced, a stale record is served instead of the error.
    ///
    /// # Errors
    ///
    /// The fetch error when no fallback record exists or the call is forced.
    pub async fn get<F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        force_refresh: bool,
        fetch: F,
    ) -> Result<Option<Value>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<Value>>>,
    {
        if !force_refresh {
            if let Some(record) = self.lookup_fresh(key, ttl).await {
                debug!(key, age_secs = record.age(self.clock.now()).as_secs(), "Cache hit");
                return Ok(Some(record.payload));
            }
        }

        let requested_at = self.clock.now();
        let seen = self.shadow_generation(key);
        let _guard = self.locks.lock(key.to_string()).await;

        // Another caller may have refreshed the key while we waited.
        if force_refresh {
            let refreshed = self
                .shadow
                .read()
                .get(key)
                .filter(|entry| {
                    Some(entry.generation) != seen && entry.record.fetched_at >= requested_at
                })
                .map(|entry| entry.record.payload.clone());
            if let Some(payload) = refreshed {
                debug!(key, "Reusing record refreshed by concurrent caller");
                return Ok(Some(payload));
            }
        } else if let Some(record) = self.lookup_fresh(key, ttl).await {
            debug!(key, "Cache filled by concurrent caller");
            return Ok(Some(record.payload));
        }

        debug!(key, force_refresh, "Cache miss, fetching");
        match fetch().await {
            Ok(Some(payload)) => {
                let record = self.put(key, payload, ttl).await;
                info!(key, records = record.record_count, "Cached fresh record");
                Ok(Some(record.payload))
            }
            Ok(None) => {
                debug!(key, "Remote has no data for key");
                Ok(None)
            }
            Err(err) => {
                if !force_refresh {
                    if let Some(stale) = self.peek(key).await {
                        warn!(
                            key,
                            age_secs = stale.age(self.clock.now()).as_secs(),
                            error = %err,
                            "Fetch failed, serving stale record"
                        );
                        return Ok(Some(stale.payload));
                    }
                }
                Err(err)
            }
        }
    }

    /// Hold the fetch locks of several keys, taken in sorted order.
    ///
    /// Callers that fill keys with [`put`](Self::put) hold these so they do
    /// not race [`get`](Self::get) on the same keys.
    pub async fn lock_keys(&self, keys: &[String]) -> Vec<KeyGuard<String>> {
        let mut sorted: Vec<&String> = keys.iter().collect();
        sorted.sort();
        sorted.dedup();
        let mut guards = Vec::with_capacity(sorted.len());
        for key in sorted {
            guards.push(self.locks.lock(key.clone()).await);
        }
        guards
    }

    /// The record for `key` if it is younger than `ttl`.
    pub async fn lookup_fresh(&self, key: &str, ttl: Duration) -> Option<CacheRecord> {
        let record = self.peek(key).await?;
        record.is_fresh(self.clock.now(), ttl).then_some(record)
    }

    /// The record for `key` regardless of age.
    pub async fn peek(&self, key: &str) -> Option<CacheRecord> {
        let shadowed = self.shadow.read().get(key).map(|entry| entry.record.clone());
        if shadowed.is_some() {
            return shadowed;
        }

        match self.store.load(key).await {
            Ok(Some(record)) => {
                self.remember(record.clone());
                Some(record)
            }
            Ok(None) => None,
            Err(err) => {
                warn!(key, error = %err, "Failed to load cache record, treating as miss");
                None
            }
        }
    }

    /// Record `payload` under `key` as fetched now.
    ///
    /// Persistence failures are logged; the in-memory record is kept.
    pub async fn put(&self, key: &str, payload: Value, ttl: Duration) -> CacheRecord {
        let record = CacheRecord::new(key, payload, self.clock.now(), ttl);
        if let Err(err) = self.store.save(&record).await {
            warn!(key, error = %err, "Failed to persist cache record");
        }
        self.remember(record.clone());
        record
    }

    /// Records whose key starts with `prefix`, regardless of age.
    ///
    /// # Errors
    ///
    /// Store listing failures.
    pub async fn records_with_prefix(&self, prefix: &str) -> Result<Vec<CacheRecord>> {
        let mut records = Vec::new();
        for key in self.keys().await? {
            if key.starts_with(prefix) {
                if let Some(record) = self.peek(&key).await {
                    records.push(record);
                }
            }
        }
        Ok(records)
    }

    /// Summary of every cached key, sorted by key.
    ///
    /// # Errors
    ///
    /// Store listing failures.
    pub async fn info(&self) -> Result<Vec<CacheEntryInfo>> {
        let now = self.clock.now();
        let mut infos = Vec::new();
        for key in self.keys().await? {
            if let Some(record) = self.peek(&key).await {
                infos.push(record.info(now));
            }
        }
        infos.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(infos)
    }

    /// Drop one key. Returns whether anything was removed.
    ///
    /// # Errors
    ///
    /// Store removal failures.
    pub async fn invalidate(&self, key: &str) -> Result<bool> {
        let in_memory = self.shadow.write().remove(key).is_some();
        let on_disk = self.store.remove(key).await?;
        Ok(in_memory || on_disk)
    }

    /// Drop every key starting with `prefix` (all keys for `None`).
    ///
    /// # Errors
    ///
    /// Store listing or removal failures.
    pub async fn clear(&self, prefix: Option<&str>) -> Result<usize> {
        let mut removed = 0;
        for key in self.keys().await? {
            if prefix.map_or(true, |p| key.starts_with(p)) && self.invalidate(&key).await? {
                removed += 1;
            }
        }
        info!(prefix = prefix.unwrap_or("*"), removed, "Cleared cache");
        Ok(removed)
    }

    /// Forget the in-memory shadow; persisted records are untouched.
    pub fn clear_shadow(&self) {
        self.shadow.write().clear();
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut keys = self.store.keys().await?;
        keys.extend(self.shadow.read().keys().cloned());
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    fn shadow_generation(&self, key: &str) -> Option<u64> {
        self.shadow.read().get(key).map(|entry| entry.generation)
    }

    fn remember(&self, record: CacheRecord) {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        self.shadow
            .write()
            .insert(record.key.clone(), ShadowEntry { record, generation });
    }
}

impl std::fmt::Debug for EntityCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityCache")
            .field("shadow_entries", &self.shadow.read().len())
            .finish_non_exhaustive()
    }
}
