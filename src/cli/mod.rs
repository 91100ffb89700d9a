//! CLI module for fixturedb
//!
//! Provides the command-line interface:
//! - init: create the data directory layout and default config
//! - start: boot the engine and serve the REST API

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::{init, run, start, Config};
pub use errors::{CliError, CliResult};
