//! Corelink Client
//!
//! Dispatches jobs to a remote agent through a shared Redis broker and reads
//! back their results and live output.
//!
//! The client pushes a job envelope onto `core:default`, waits briefly for the
//! agent to pick it up, and hands back a [`JobHandle`]. The handle is then
//! polled for the job's result or attached to its live output stream.
//!
//! # Example
//!
//! ```no_run
//! use corelink_client::{ClientConfig, DispatchClient};
//! use corelink_core::dto::job::DispatchRequest;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = DispatchClient::connect(&ClientConfig::new("10.0.0.5")).await?;
//!
//!     let job = client
//!         .dispatch(DispatchRequest::new("core.system", json!({"name": "uptime"})))
//!         .await?;
//!     let result = job.get(None).await?;
//!
//!     println!("{}", result.stdout());
//!     Ok(())
//! }
//! ```

pub mod broker;
pub mod config;
mod dispatch;
pub mod error;
mod handle;
mod jobs;
mod sink;

// Re-export commonly used types
pub use broker::{BrokerError, BrokerGateway, MemoryBroker, RedisBroker};
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use handle::{JobHandle, POLL_SLICE};
pub use jobs::{JobManager, SIGTERM};
pub use sink::StdioSink;

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Client for dispatching jobs through a broker
///
/// Cheap to clone; clones share the same broker gateway.
#[derive(Clone)]
pub struct DispatchClient {
    /// Broker gateway shared with every handle this client creates
    broker: Arc<dyn BrokerGateway>,
    /// Default client-side wait for results
    timeout: Duration,
}

impl std::fmt::Debug for DispatchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchClient")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl DispatchClient {
    /// Create a client over an existing broker gateway
    ///
    /// # Example
    /// ```
    /// use corelink_client::{DispatchClient, MemoryBroker};
    /// use std::sync::Arc;
    ///
    /// let client = DispatchClient::new(Arc::new(MemoryBroker::new()));
    /// assert_eq!(client.timeout().as_secs(), 10);
    /// ```
    pub fn new(broker: Arc<dyn BrokerGateway>) -> Self {
        Self::with_timeout(broker, config::DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom default result timeout
    pub fn with_timeout(broker: Arc<dyn BrokerGateway>, timeout: Duration) -> Self {
        Self { broker, timeout }
    }

    /// Connect to the broker described by `config`
    ///
    /// Opens a Redis gateway and checks it with [`DispatchClient::connect_with`].
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let broker = RedisBroker::open(&config.redis_url())?;
        Self::connect_with(Arc::new(broker), config).await
    }

    /// Build a client over `broker` and check that the agent answers
    ///
    /// Pings the agent up to `config.connect_attempts` times and fails if none
    /// of them is answered. Zero attempts skips the check.
    ///
    /// # Errors
    /// - `InvalidConfig` if `config` does not validate
    /// - `ConnectionFailed` once every attempt has failed
    pub async fn connect_with(
        broker: Arc<dyn BrokerGateway>,
        config: &ClientConfig,
    ) -> Result<Self> {
        config.validate()?;
        let client = Self::with_timeout(broker, config.timeout);

        if config.connect_attempts == 0 {
            return Ok(client);
        }

        for attempt in 1..=config.connect_attempts {
            match client.ping().await {
                Ok(_) => {
                    info!("Connected to {} (attempt {})", config.address(), attempt);
                    return Ok(client);
                }
                Err(e) => {
                    warn!(
                        "Ping to {} failed (attempt {}/{}): {}",
                        config.address(),
                        attempt,
                        config.connect_attempts,
                        e
                    );
                }
            }
        }

        Err(ClientError::ConnectionFailed {
            address: config.address(),
            attempts: config.connect_attempts,
        })
    }

    /// Default result timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The broker gateway this client talks through
    pub fn broker(&self) -> &Arc<dyn BrokerGateway> {
        &self.broker
    }

    /// Rebuild a handle for a job id known from elsewhere
    pub fn response_for(&self, id: impl Into<String>) -> JobHandle {
        JobHandle::new(id, self.broker.clone(), self.timeout)
    }

    /// Job management commands
    pub fn jobs(&self) -> JobManager<'_> {
        JobManager::new(self)
    }
}
