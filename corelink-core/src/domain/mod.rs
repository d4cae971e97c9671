//! Core domain types
//!
//! This module contains the structures read back from the broker: job states
//! and phases, result envelopes, and live output stream messages.

pub mod job;
pub mod result;
pub mod stream;
