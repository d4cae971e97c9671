//! Corelink Core
//!
//! Wire types and codecs for the corelink job protocol.
//!
//! This crate contains:
//! - Domain types: job states, result envelopes and stream messages
//! - DTOs: the job envelope submitted to the agent queue, with validation
//! - Keys: the broker key layout shared with the remote agent

pub mod domain;
pub mod dto;
pub mod error;
pub mod keys;

pub use error::{DecodeError, EncodeError, ResultError, SchemaError};
