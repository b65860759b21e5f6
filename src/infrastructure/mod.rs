//! Infrastructure layer.
//!
//! Technical concerns that support the gateway without containing its logic.
//!
//! # Submodules
//!
//! - [`bootstrap`] - Composition root for gateway wiring
//! - [`config`] - Configuration loading, validation and logging setup

pub mod bootstrap;
pub mod config;
