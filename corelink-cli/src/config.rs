//! Configuration module
//!
//! Turns global CLI flags into a broker connection configuration.

use std::time::Duration;

use anyhow::{Context, Result};
use corelink_client::ClientConfig;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Broker host
    pub host: String,
    /// Broker port
    pub port: u16,
    /// Broker password, empty for none
    pub password: String,
    /// Broker database index
    pub db: i64,
    /// Default result timeout in seconds
    pub timeout: u64,
    /// Pings sent before giving up on the agent
    pub connect_attempts: u32,
    /// Connect over TLS
    pub ssl: bool,
}

impl Config {
    /// Builds a validated client configuration
    pub fn client_config(&self) -> Result<ClientConfig> {
        let config = ClientConfig {
            host: self.host.clone(),
            port: self.port,
            password: self.password.clone(),
            db: self.db,
            timeout: Duration::from_secs(self.timeout),
            connect_attempts: self.connect_attempts,
            ssl: self.ssl,
        };
        config
            .validate()
            .with_context(|| format!("Invalid connection settings for {}", config.address()))?;
        Ok(config)
    }
}
