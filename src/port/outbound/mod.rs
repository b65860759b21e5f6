//! Outbound ports: what the gateway needs from the outside world.

pub mod clock;
pub mod store;
pub mod transport;
