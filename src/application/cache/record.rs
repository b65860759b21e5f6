//! Persisted cache records.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A persisted snapshot of one logical key.
///
/// Serialized as a self-describing document:
///
/// ```json
/// {"key": "alliance_nations:9445", "last_updated": "2024-06-01T12:00:00Z",
///  "ttl_secs": 3600, "record_count": 42, "payload": [...]}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub key: String,
    #[serde(rename = "last_updated")]
    pub fetched_at: DateTime<Utc>,
    pub ttl_secs: u64,
    pub record_count: usize,
    pub payload: Value,
}

impl CacheRecord {
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        payload: Value,
        fetched_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            key: key.into(),
            fetched_at,
            ttl_secs: ttl.as_secs(),
            record_count: count_records(&payload),
            payload,
        }
    }

    /// Age at `now`; zero when the record claims to come from the future.
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.fetched_at).to_std().unwrap_or(Duration::ZERO)
    }

    /// Fresh iff `now - fetched_at < ttl`.
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age(now) < ttl
    }

    /// Freshness against the TTL the record was written with.
    #[must_use]
    pub fn is_fresh_by_own_ttl(&self, now: DateTime<Utc>) -> bool {
        self.is_fresh(now, Duration::from_secs(self.ttl_secs))
    }

    #[must_use]
    pub fn info(&self, now: DateTime<Utc>) -> CacheEntryInfo {
        CacheEntryInfo {
            key: self.key.clone(),
            last_updated: self.fetched_at,
            age: self.age(now),
            ttl: Duration::from_secs(self.ttl_secs),
            record_count: self.record_count,
            fresh: self.is_fresh_by_own_ttl(now),
        }
    }
}

/// Arrays count their elements, `null` counts nothing, anything else is one record.
fn count_records(payload: &Value) -> usize {
    match payload {
        Value::Array(items) => items.len(),
        Value::Null => 0,
        _ => 1,
    }
}

/// Summary of one cached key, for administration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheEntryInfo {
    pub key: String,
    pub last_updated: DateTime<Utc>,
    #[serde(with = "secs")]
    pub age: Duration,
    #[serde(with = "secs")]
    pub ttl: Duration,
    pub record_count: usize,
    pub fresh: bool,
}

mod secs {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn freshness_boundary_is_exclusive() {
        let record = CacheRecord::new("k", json!([]), at(0), Duration::from_secs(60));
        assert!(record.is_fresh(at(59), Duration::from_secs(60)));
        assert!(!record.is_fresh(at(60), Duration::from_secs(60)));
        assert!(!record.is_fresh(at(61), Duration::from_secs(60)));
    }

    #[test]
    fn record_count_follows_payload_shape() {
        assert_eq!(CacheRecord::new("k", json!([1, 2, 3]), at(0), Duration::ZERO).record_count, 3);
        assert_eq!(CacheRecord::new("k", json!({"a": 1}), at(0), Duration::ZERO).record_count, 1);
        assert_eq!(CacheRecord::new("k", Value::Null, at(0), Duration::ZERO).record_count, 0);
    }

    #[test]
    fn serializes_last_updated_as_iso8601() {
        let record =
            CacheRecord::new("alliance_nations:1", json!([]), at(0), Duration::from_secs(3600));
        let doc = serde_json::to_value(&record).unwrap();
        assert_eq!(doc["last_updated"], json!("2023-11-14T22:13:20Z"));
        assert_eq!(doc["record_count"], json!(0));
        let back: CacheRecord = serde_json::from_value(doc).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn future_records_have_zero_age() {
        let record = CacheRecord::new("k", json!(1), at(100), Duration::from_secs(1));
        assert_eq!(record.age(at(0)), Duration::ZERO);
    }
}
