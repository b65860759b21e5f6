//! Infrastructure configuration modules.

pub mod api;
pub mod cache;
pub mod fetch;
pub mod logging;
pub mod resolver;
pub mod settings;

pub use settings::Config;
