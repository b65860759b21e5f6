//! Implementations of ports (hexagonal adapters).
//!
//! - [`inbound`] - Driving side: the command-line interface
//! - [`outbound`] - Driven side: GraphQL transport and record stores

pub mod inbound;
pub mod outbound;
