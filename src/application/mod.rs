//! Application services.
//!
//! The components every fetch passes through, leaves first:
//!
//! - [`executor`] - Rate limiting, response dedupe, timeouts and retry
//! - [`pagination`] - Page-by-page fetching with cutoff early exit
//! - [`batch`] - Aliased composite queries and their split responses
//! - [`cache`] - Persisted TTL cache with a per-key fetch lock
//! - [`resolver`] - Cascading identifier resolution
//! - [`coordinator`] - Bounded, staggered concurrent fetches
//! - [`gateway`] - The [`Gateway`] object tying them together

pub mod batch;
pub mod builder;
pub mod cache;
pub mod coordinator;
pub mod executor;
pub mod gateway;
pub mod pagination;
pub mod query;
pub mod resolver;
pub mod singleflight;

pub use builder::{GatewayBuilder, GatewaySettings};
pub use gateway::{CacheScope, Gateway, MemberFetch};
