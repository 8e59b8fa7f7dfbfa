//! # Command-Line Interface
//!
//! Operator commands over the same orchestrators the HTTP surface
//! exposes. Destructive commands confirm before acting.

pub mod args;
pub mod commands;
pub mod errors;

pub use args::{Cli, Command};
pub use commands::run;
pub use errors::{CliError, CliResult};
