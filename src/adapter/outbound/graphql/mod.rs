//! GraphQL over HTTP.

pub mod client;

pub use client::HttpTransport;
