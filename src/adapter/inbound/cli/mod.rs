//! Command-line adapter over the gateway.

pub mod command;
pub mod handler;
pub mod output;

pub use command::Cli;
pub use handler::{dispatch, Outcome};
