//! Error types for the corelink client

use std::time::Duration;

use corelink_core::{DecodeError, EncodeError, SchemaError};
use thiserror::Error;

use crate::broker::BrokerError;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when dispatching jobs or reading their results
#[derive(Debug, Error)]
pub enum ClientError {
    /// Envelope failed validation and was never sent
    #[error("Invalid job envelope: {0}")]
    Schema(#[from] SchemaError),

    /// Envelope could not be serialized
    #[error("{0}")]
    Encode(#[from] EncodeError),

    /// The broker no longer tracks the job
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// Client-side deadline passed before a result arrived
    #[error("Timed out after {waited:?} waiting for job {id}")]
    Timeout {
        /// Job ID
        id: String,
        /// Budget that was exhausted
        waited: Duration,
    },

    /// The job finished in a state other than SUCCESS
    #[error("Remote execution failed (code {code}): {message}")]
    RemoteExecution {
        /// Result data reported by the agent
        message: String,
        /// Result code, `1000 + exit code` for process failures
        code: i64,
    },

    /// Payload had the wrong level or could not be parsed
    #[error("Failed to decode payload: {0}")]
    Decode(#[from] DecodeError),

    /// Broker transport failure
    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The agent never answered a ping
    #[error("Could not connect to remote host {address} after {attempts} attempt(s)")]
    ConnectionFailed { address: String, attempts: u32 },
}

impl ClientError {
    /// Create a remote execution error from result data and code
    pub fn remote(message: impl Into<String>, code: i64) -> Self {
        Self::RemoteExecution {
            message: message.into(),
            code,
        }
    }

    /// Check if this error means the job is unknown to the broker
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::JobNotFound(_))
    }

    /// Check if this error is a client-side timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Check if this error came from the broker transport
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Broker(_))
    }

    /// Process exit code carried by a remote execution error, if any
    pub fn exit_code(&self) -> Option<i64> {
        match self {
            Self::RemoteExecution { code, .. } if *code >= 1000 => Some(code - 1000),
            _ => None,
        }
    }
}
