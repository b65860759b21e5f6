//! Inbound ports: what the gateway offers to the rest of the system.

pub mod gateway;
