//! CLI command implementations.
//!
//! `init` lays out the data directory and writes a default configuration;
//! `start` boots the engine (reloading persisted schemas) and serves the
//! REST API on a tokio runtime.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::engine::EntityEngine;
use crate::observability::Logger;
use crate::realtime::{ChangeNotifier, DEFAULT_CHANNEL_CAPACITY};
use crate::rest_api::{ApiConfig, ApiServer};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};

/// Configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory for persisted schema definitions
    pub data_dir: String,

    /// Bind address (default "0.0.0.0")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Listen port (default 8470)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins; empty means permissive
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Capacity of the change event channel (default 256)
    #[serde(default = "default_channel_capacity")]
    pub event_channel_capacity: usize,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8470
}
fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

impl Config {
    /// Default configuration rooted at the given data directory.
    pub fn with_data_dir(data_dir: impl Into<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            bind_address: default_bind_address(),
            port: default_port(),
            cors_origins: Vec::new(),
            event_channel_capacity: default_channel_capacity(),
        }
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config(format!("failed to read {}: {}", path.display(), e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config(format!("invalid config JSON: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> CliResult<()> {
        if self.data_dir.trim().is_empty() {
            return Err(CliError::config("data_dir must not be empty"));
        }
        if self.port == 0 {
            return Err(CliError::config("port must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(CliError::config("event_channel_capacity must be > 0"));
        }
        Ok(())
    }

    /// The REST server configuration derived from this file.
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            bind_address: self.bind_address.clone(),
            port: self.port,
            cors_origins: self.cors_origins.clone(),
        }
    }
}

/// Parse arguments and dispatch to the selected command.
pub fn run() -> CliResult<()> {
    match Cli::parse_args().command {
        Command::Init { config } => init(&config),
        Command::Start { config } => start(&config),
    }
}

fn is_initialized(data_dir: &Path) -> bool {
    data_dir.join("schemas").is_dir()
}

/// Initialize the data directory and write a default config if absent.
pub fn init(config_path: &Path) -> CliResult<()> {
    let config = if config_path.exists() {
        Config::load(config_path)?
    } else {
        let config = Config::with_data_dir("./fixturedb-data");
        let content = serde_json::to_string_pretty(&config)
            .map_err(|e| CliError::config(format!("serialize default config: {}", e)))?;
        fs::write(config_path, content)?;
        config
    };

    let data_dir = Path::new(&config.data_dir);
    if is_initialized(data_dir) {
        return Err(CliError::AlreadyInitialized(config.data_dir));
    }

    fs::create_dir_all(data_dir.join("schemas"))?;
    Logger::info("INIT_COMPLETE", &[("data_dir", &config.data_dir)]);
    Ok(())
}

/// Boot the engine and serve the REST API until the process exits.
pub fn start(config_path: &Path) -> CliResult<()> {
    let config = Config::load(config_path)?;

    let data_dir = Path::new(&config.data_dir);
    if !is_initialized(data_dir) {
        return Err(CliError::NotInitialized(config.data_dir.clone()));
    }

    let notifier = ChangeNotifier::new(config.event_channel_capacity);
    let engine = EntityEngine::with_data_dir(data_dir, notifier)
        .map_err(|e| CliError::boot(format!("schema load failed: {}", e)))?;

    let server = ApiServer::new(Arc::new(engine), config.api_config());

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot(format!("failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        server
            .start()
            .await
            .map_err(|e| CliError::boot(format!("HTTP server failed: {}", e)))
    })
}
