//! CLI argument definitions using clap
//!
//! Commands:
//! - fixturedb init --config <path>
//! - fixturedb start --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// fixturedb - A self-hostable dynamic entity service for test-data pools
#[derive(Parser, Debug)]
#[command(name = "fixturedb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize the data directory and write a default configuration
    Init {
        /// Path to configuration file
        #[arg(long, default_value = "./fixturedb.json")]
        config: PathBuf,
    },

    /// Start the fixturedb server
    Start {
        /// Path to configuration file
        #[arg(long, default_value = "./fixturedb.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
