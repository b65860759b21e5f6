//! Composite queries through GraphQL aliasing.
//!
//! N per-entity sub-queries are embedded in one document under aliases
//! `entity_<id>`, and the response is split back per alias. An alias that
//! comes back absent or empty is a gap for that id only. When the composite
//! request itself fails, the same ids are retried one by one, and an id whose
//! own request fails carries that error in its slot.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use super::executor::RequestExecutor;
use crate::error::{Error, Result};

/// Placeholder substituted with each id.
pub const ID_PLACEHOLDER: &str = "{id}";

/// Per-entity sub-query with an `{id}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubQueryTemplate(String);

impl SubQueryTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    #[must_use]
    pub fn render(&self, id: &str) -> String {
        self.0.replace(ID_PLACEHOLDER, id)
    }
}

/// One aliased sub-query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub alias: String,
    /// Caller's key for this entry (an id or a name).
    pub key: String,
    pub sub_query: String,
}

impl BatchEntry {
    fn document(&self) -> String {
        format!("{{ {}: {} }}", self.alias, self.sub_query)
    }
}

/// A composite request: ordered aliased entries.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchRequest {
    pub entries: Vec<BatchEntry>,
}

impl BatchRequest {
    /// The outer document embedding every entry.
    #[must_use]
    pub fn document(&self) -> String {
        let body: Vec<String> = self
            .entries
            .iter()
            .map(|e| format!("{}: {}", e.alias, e.sub_query))
            .collect();
        format!("{{ {} }}", body.join(" "))
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

/// Result for one entry of a composite response.
#[derive(Debug)]
pub enum BatchSlot {
    Present(Value),
    /// No data came back for this entry.
    Missing,
    /// The per-entry request made after a composite failure failed too.
    Failed(Error),
}

impl BatchSlot {
    /// The block, treating failures like gaps.
    #[must_use]
    pub fn into_option(self) -> Option<Value> {
        match self {
            Self::Present(v) => Some(v),
            Self::Missing | Self::Failed(_) => None,
        }
    }

    /// The block, `None` for a gap, or the entry's own error.
    ///
    /// # Errors
    ///
    /// The error of a [`BatchSlot::Failed`] entry.
    pub fn into_result(self) -> Result<Option<Value>> {
        match self {
            Self::Present(v) => Ok(Some(v)),
            Self::Missing => Ok(None),
            Self::Failed(err) => Err(err),
        }
    }

    #[must_use]
    pub const fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Whether an alias block carries nothing: `null`, `{}`, `[]` or `{"data": []}`.
fn is_empty_block(block: &Value) -> bool {
    match block {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => {
            map.is_empty()
                || (map.len() == 1
                    && map
                        .get("data")
                        .is_some_and(|d| d.is_null() || d.as_array().is_some_and(Vec::is_empty)))
        }
        _ => false,
    }
}

/// Builds, runs and splits composite requests.
#[derive(Debug, Clone)]
pub struct BatchQueryBuilder {
    executor: Arc<RequestExecutor>,
    max_ids_per_query: usize,
}

impl BatchQueryBuilder {
    #[must_use]
    pub fn new(executor: Arc<RequestExecutor>, max_ids_per_query: usize) -> Self {
        Self {
            executor,
            max_ids_per_query: max_ids_per_query.max(1),
        }
    }

    #[must_use]
    pub const fn max_ids_per_query(&self) -> usize {
        self.max_ids_per_query
    }

    /// Alias for an id.
    #[must_use]
    pub fn alias_for(id: u64) -> String {
        format!("entity_{id}")
    }

    /// One request per chunk of at most `max_ids_per_query` ids.
    /// Duplicate ids are embedded once.
    #[must_use]
    pub fn build_batches(&self, ids: &[u64], template: &SubQueryTemplate) -> Vec<BatchRequest> {
        let mut unique = Vec::with_capacity(ids.len());
        for id in ids {
            if !unique.contains(id) {
                unique.push(*id);
            }
        }
        unique
            .chunks(self.max_ids_per_query)
            .map(|chunk| Self::build_batch(chunk, template))
            .collect()
    }

    /// One request for `ids`, whatever their number.
    #[must_use]
    pub fn build_batch(ids: &[u64], template: &SubQueryTemplate) -> BatchRequest {
        BatchRequest {
            entries: ids
                .iter()
                .map(|id| BatchEntry {
                    alias: Self::alias_for(*id),
                    key: id.to_string(),
                    sub_query: template.render(&id.to_string()),
                })
                .collect(),
        }
    }

    /// Requests for arbitrary keyed sub-queries, aliased by position.
    #[must_use]
    pub fn build_keyed(&self, items: &[(String, String)]) -> Vec<BatchRequest> {
        items
            .chunks(self.max_ids_per_query)
            .map(|chunk| BatchRequest {
                entries: chunk
                    .iter()
                    .enumerate()
                    .map(|(i, (key, sub_query))| BatchEntry {
                        alias: format!("entity_{i}"),
                        key: key.clone(),
                        sub_query: sub_query.clone(),
                    })
                    .collect(),
            })
            .collect()
    }

    /// Split a composite `data` object into per-entry slots, in entry order.
    #[must_use]
    pub fn split_response(request: &BatchRequest, data: &Value) -> Vec<(String, BatchSlot)> {
        request
            .entries
            .iter()
            .map(|entry| {
                let slot = match data.get(&entry.alias) {
                    Some(block) if !is_empty_block(block) => BatchSlot::Present(block.clone()),
                    _ => BatchSlot::Missing,
                };
                (entry.key.clone(), slot)
            })
            .collect()
    }

    /// Send one composite request, falling back to per-entry requests.
    ///
    /// # Errors
    ///
    /// Only when the composite request and every per-entry request fail;
    /// the last per-entry error is returned.
    pub async fn run(&self, request: &BatchRequest) -> Result<Vec<(String, BatchSlot)>> {
        if request.is_empty() {
            return Ok(Vec::new());
        }

        match self.executor.execute(&request.document()).await {
            Ok(data) => {
                let slots = Self::split_response(request, &data);
                let missing = slots.iter().filter(|(_, s)| s.is_missing()).count();
                debug!(entries = request.len(), missing, "Batch request complete");
                Ok(slots)
            }
            Err(err) => {
                warn!(
                    entries = request.len(),
                    error = %err,
                    "Batch request failed, falling back to sequential requests"
                );
                self.run_sequential(request).await
            }
        }
    }

    async fn run_sequential(&self, request: &BatchRequest) -> Result<Vec<(String, BatchSlot)>> {
        let mut slots = Vec::with_capacity(request.len());
        let mut succeeded = 0usize;

        for entry in &request.entries {
            match self.executor.execute(&entry.document()).await {
                Ok(data) => {
                    succeeded += 1;
                    let single = BatchRequest {
                        entries: vec![entry.clone()],
                    };
                    slots.extend(Self::split_response(&single, &data));
                }
                Err(err) => {
                    warn!(key = %entry.key, error = %err, "Sequential fetch failed");
                    slots.push((entry.key.clone(), BatchSlot::Failed(err)));
                }
            }
        }

        if succeeded == 0 {
            if let Some((_, BatchSlot::Failed(err))) = slots.pop() {
                return Err(err);
            }
        }
        Ok(slots)
    }
}
