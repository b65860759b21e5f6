//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`transport`] - [`ScriptedTransport`], a [`GraphqlTransport`](crate::port::GraphqlTransport)
//!   driven by a closure, recording every document it receives.
//! - [`clock`] - [`ManualClock`] for cache freshness tests.
//! - [`responses`] - Builders for GraphQL response envelopes and pages.
//! - [`fixtures`] - JSON builders for nations, alliances and wars.
//! - [`config`] - Canonical gateway settings and configuration.

pub mod clock;
pub mod config;
pub mod fixtures;
pub mod responses;
pub mod transport;

pub use clock::ManualClock;
pub use responses::{
    data_response, error_response, page_response, protocol_failure, transport_failure,
};
pub use transport::{ScriptedTransport, SentRequest};
