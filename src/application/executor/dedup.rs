//! Short-window response deduplication.
//!
//! Byte-identical query documents sent within the window share one
//! response. Keys are a hash of the document text.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use dashmap::DashMap;
use serde_json::Value;
use tokio::time::Instant;

/// Upper bound on retained responses before a sweep runs.
const MAX_ENTRIES: usize = 256;

/// Hash a query document into its dedupe key.
#[must_use]
pub fn query_hash(document: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    document.hash(&mut hasher);
    hasher.finish()
}

/// Thread-safe cache of recent responses keyed by query hash.
#[derive(Debug)]
pub struct ResponseDeduplicator {
    entries: DashMap<u64, (Instant, Value)>,
    ttl: Duration,
    max_entries: usize,
}

impl ResponseDeduplicator {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_entries: MAX_ENTRIES,
        }
    }

    /// Whether the window is enabled at all.
    #[must_use]
    pub fn enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    /// A response recorded for `hash` within the window, if any.
    #[must_use]
    pub fn get(&self, hash: u64) -> Option<Value> {
        if !self.enabled() {
            return None;
        }
        let entry = self.entries.get(&hash)?;
        let (stored_at, value) = entry.value();
        if stored_at.elapsed() < self.ttl {
            Some(value.clone())
        } else {
            None
        }
    }

    /// Record a successful response.
    pub fn insert(&self, hash: u64, value: Value) {
        if !self.enabled() {
            return;
        }
        self.entries.insert(hash, (Instant::now(), value));
        if self.entries.len() > self.max_entries {
            self.gc();
        }
    }

    /// Drop expired entries, then the oldest ones while over capacity.
    pub fn gc(&self) {
        let ttl = self.ttl;
        self.entries.retain(|_, (stored_at, _)| stored_at.elapsed() < ttl);

        if self.entries.len() > self.max_entries {
            let mut ages: Vec<(u64, Instant)> = self
                .entries
                .iter()
                .map(|entry| (*entry.key(), entry.value().0))
                .collect();
            ages.sort_by(|a, b| a.1.cmp(&b.1));
            let excess = ages.len().saturating_sub(self.max_entries);
            for (hash, _) in ages.into_iter().take(excess) {
                self.entries.remove(&hash);
            }
        }
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
