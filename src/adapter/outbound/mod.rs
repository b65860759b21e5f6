//! Outbound adapters (driven side).

pub mod graphql;
pub mod store;
