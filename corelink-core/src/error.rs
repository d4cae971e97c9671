//! Error types for envelope encoding and result decoding

use thiserror::Error;

/// A job envelope failed structural validation before submission
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid envelope field `{field}`: {reason}")]
pub struct SchemaError {
    /// Name of the offending wire field
    pub field: &'static str,
    /// Why the value was rejected
    pub reason: String,
}

impl SchemaError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// A payload could not be decoded into the expected shape
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Payload bytes are not valid JSON for the target type
    #[error("malformed {what}: {source}")]
    Malformed {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Result data is not tagged as structured (JSON) output
    #[error("invalid result level, expecting json({expected}) got ({actual})")]
    UnexpectedLevel { expected: i64, actual: i64 },
}

impl DecodeError {
    pub fn malformed(what: &'static str, source: serde_json::Error) -> Self {
        Self::Malformed { what, source }
    }
}

/// A job envelope could not be serialized
#[derive(Debug, Error)]
#[error("failed to encode job envelope: {0}")]
pub struct EncodeError(#[from] serde_json::Error);

/// A result cannot be viewed as a successful structured result
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (code {code})")]
pub struct ResultError {
    pub message: String,
    pub code: i64,
}

impl ResultError {
    pub fn new(message: impl Into<String>, code: i64) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }
}
