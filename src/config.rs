//! Configuration Module
//!
//! This module defines all configuration structures for the registry service.
//! Configuration is loaded from TOML files and parsed using serde.

use serde::Deserialize;
use std::fs;

/// Main configuration structure
///
/// Contains all configuration sections for the registry service.
/// Loaded from a TOML file (e.g., config/default.toml).
///
/// # Example TOML
/// ```toml
/// [api]
/// host = "127.0.0.1"
/// port = 8545
///
/// [chain]
/// genesis_height = 0
/// block_interval_ms = 1000
///
/// [database]
/// url = "sqlite://registry.db?mode=rwc"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub chain: ChainConfig,
    pub database: DatabaseConfig,
}

/// API server configuration
///
/// Controls the JSON-RPC API endpoint settings.
///
/// # Fields
/// - `host`: IP address to bind to (e.g., "127.0.0.1" or "0.0.0.0")
/// - `port`: TCP port to listen on (e.g., 8545)
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

/// Logical clock configuration
///
/// # Fields
/// - `genesis_height`: Block height the clock starts at
/// - `block_interval_ms`: Time between blocks (in milliseconds)
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    #[serde(default)]
    pub genesis_height: u64,
    pub block_interval_ms: u64,
}

/// Database configuration
///
/// Settings for the event journal database.
///
/// # Fields
/// - `url`: Database connection URL (e.g., "sqlite://registry.db?mode=rwc")
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the TOML configuration file
    ///
    /// # Returns
    /// * `Ok(Config)` if the file was successfully loaded and parsed
    /// * `Err` if the file couldn't be read or the TOML is invalid
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}
