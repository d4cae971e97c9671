//! Broker gateway
//!
//! The agent and this client only meet through a shared key/list store. The
//! gateway is the narrow set of store primitives the job protocol needs.
//!
//! Gateways surface store failures unmodified and never retry; retry and
//! backoff belong to the caller.

mod memory;
mod redis_store;

pub use memory::MemoryBroker;
pub use redis_store::RedisBroker;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a broker gateway
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Redis command or connection failure
    #[error("Redis command failed: {0}")]
    Redis(#[from] redis::RedisError),

    /// Store cannot be reached
    #[error("Broker unavailable: {0}")]
    Unavailable(String),
}

/// Store primitives used by the job protocol
#[async_trait]
pub trait BrokerGateway: Send + Sync {
    /// Appends a payload to the tail of a list
    async fn enqueue(&self, queue: &str, payload: String) -> Result<(), BrokerError>;

    /// Waits up to `timeout` for the tail of a list and rotates it back onto
    /// the head, so the value stays readable
    async fn block_pop_rotate(
        &self,
        queue: &str,
        timeout: Duration,
    ) -> Result<Option<String>, BrokerError>;

    /// Returns true if the key exists
    async fn exists_flag(&self, key: &str) -> Result<bool, BrokerError>;

    /// Remaining time to live of a key; `None` if it has no expiry or is gone
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, BrokerError>;

    /// Waits up to `timeout` for the head of a list and removes it
    async fn block_pop(&self, key: &str, timeout: Duration)
    -> Result<Option<String>, BrokerError>;
}
