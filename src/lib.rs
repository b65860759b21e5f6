//! Orbis Gateway - rate-limited, cached access to the Politics & War
//! GraphQL API.
//!
//! Every feature that needs remote game data goes through one [`Gateway`]
//! object, which owns:
//!
//! - a request executor with pacing, short-lived response dedupe and retry
//! - page-by-page fetching with an early exit at a time cutoff
//! - aliased composite queries that fetch several alliances at once
//! - a persisted TTL cache that serves stale records when the API fails
//! - a cascading resolver from free text to canonical alliance ids
//!
//! # Architecture
//!
//! - [`domain`] - Typed entities: nations, alliances, wars, treaties, prices
//! - [`port`] - Inbound ([`DataGateway`](port::DataGateway)) and outbound
//!   (transport, record store, clock) traits
//! - [`application`] - The gateway and the components it is built from
//! - [`adapter`] - HTTP transport, file and memory stores, the CLI
//! - [`infrastructure`] - Configuration, logging and the composition root
//!
//! # Example
//!
//! ```no_run
//! use orbis_gateway::application::Gateway;
//! use orbis_gateway::domain::AllianceId;
//! use orbis_gateway::infrastructure::config::Config;
//! use orbis_gateway::port::FetchOptions;
//!
//! # async fn run() -> orbis_gateway::error::Result<()> {
//! let config = Config::load("config.toml")?;
//! let gateway = Gateway::open(&config)?;
//! let members = gateway
//!     .alliance_nations(AllianceId::new(9445), FetchOptions::default())
//!     .await?;
//! gateway.close();
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

pub use application::{Gateway, GatewayBuilder};
pub use error::{Error, Result};
