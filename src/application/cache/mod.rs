//! Persisted entity cache.
//!
//! - [`record::CacheRecord`]: one self-describing snapshot per logical key
//! - [`entity::EntityCache`]: TTL read-through cache with stale fallback

pub mod entity;
pub mod record;

pub use entity::EntityCache;
pub use record::{CacheEntryInfo, CacheRecord};
