//! CLI-specific error types.
//!
//! All CLI errors are fatal: the process prints them and exits non-zero.

use std::io;

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// CLI error
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration file missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data directory is already initialized
    #[error("Data directory '{0}' is already initialized")]
    AlreadyInitialized(String),

    /// Data directory has not been initialized
    #[error("Data directory '{0}' is not initialized; run 'fixturedb init' first")]
    NotInitialized(String),

    /// Server failed to boot
    #[error("Boot failed: {0}")]
    Boot(String),

    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Config error from any displayable cause
    pub fn config(msg: impl Into<String>) -> Self {
        CliError::Config(msg.into())
    }

    /// Boot error from any displayable cause
    pub fn boot(msg: impl Into<String>) -> Self {
        CliError::Boot(msg.into())
    }
}
