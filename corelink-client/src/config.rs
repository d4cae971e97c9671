//! Client configuration
//!
//! Connection parameters for the broker and the default client-side timeout
//! applied when a caller does not pass one.

use std::time::Duration;

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};

use crate::error::{ClientError, Result};

/// Default client-side wait for a job result
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Broker host name or address
    pub host: String,

    /// Broker port
    pub port: u16,

    /// Broker password, empty for none
    pub password: String,

    /// Broker database index
    pub db: i64,

    /// Default wait for `get()` and the synchronous dispatch calls
    pub timeout: Duration,

    /// Pings sent by `connect` before giving up; zero skips the check
    pub connect_attempts: u32,

    /// Connect over TLS without verifying the server certificate
    pub ssl: bool,
}

impl ClientConfig {
    /// Creates a configuration for a host with defaults
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 6379,
            password: String::new(),
            db: 0,
            timeout: DEFAULT_TIMEOUT,
            connect_attempts: 3,
            ssl: true,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - CORELINK_HOST (optional, default: localhost)
    /// - CORELINK_PORT (optional, default: 6379)
    /// - CORELINK_PASSWORD (optional, default: none)
    /// - CORELINK_DB (optional, default: 0)
    /// - CORELINK_TIMEOUT (optional, seconds, default: 10)
    /// - CORELINK_CONNECT_ATTEMPTS (optional, default: 3)
    /// - CORELINK_SSL (optional, default: true)
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("CORELINK_HOST") {
            config.host = host;
        }
        if let Some(port) = parse_env("CORELINK_PORT")? {
            config.port = port;
        }
        if let Ok(password) = std::env::var("CORELINK_PASSWORD") {
            config.password = password;
        }
        if let Some(db) = parse_env("CORELINK_DB")? {
            config.db = db;
        }
        if let Some(seconds) = parse_env::<u64>("CORELINK_TIMEOUT")? {
            config.timeout = Duration::from_secs(seconds);
        }
        if let Some(attempts) = parse_env("CORELINK_CONNECT_ATTEMPTS")? {
            config.connect_attempts = attempts;
        }
        if let Some(ssl) = parse_env("CORELINK_SSL")? {
            config.ssl = ssl;
        }

        config.validate()?;
        Ok(config)
    }

    /// Sets the default result timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the broker password
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Enables or disables TLS
    pub fn with_ssl(mut self, ssl: bool) -> Self {
        self.ssl = ssl;
        self
    }

    /// Disables the ping check in `connect`
    pub fn without_connect_check(mut self) -> Self {
        self.connect_attempts = 0;
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(ClientError::InvalidConfig("host cannot be empty".into()));
        }

        if self.port == 0 {
            return Err(ClientError::InvalidConfig(
                "port must be greater than 0".into(),
            ));
        }

        if self.db < 0 {
            return Err(ClientError::InvalidConfig("db cannot be negative".into()));
        }

        if self.timeout.is_zero() {
            return Err(ClientError::InvalidConfig(
                "timeout must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Broker address without credentials, for logs and errors
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Connection URL for the Redis gateway
    ///
    /// The password is percent-encoded and IPv6 hosts are bracketed. With
    /// `ssl` set the URL uses `rediss://` and skips certificate checks, as
    /// agents ship with self-signed certificates.
    pub fn redis_url(&self) -> String {
        let scheme = if self.ssl { "rediss" } else { "redis" };
        let host = if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        let auth = if self.password.is_empty() {
            String::new()
        } else {
            format!(
                ":{}@",
                utf8_percent_encode(&self.password, NON_ALPHANUMERIC)
            )
        };
        let fragment = if self.ssl { "#insecure" } else { "" };

        format!(
            "{}://{}{}:{}/{}{}",
            scheme, auth, host, self.port, self.db, fragment
        )
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("localhost")
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ClientError::InvalidConfig(format!("{} has invalid value '{}'", name, raw))),
        Err(_) => Ok(None),
    }
}
