//! Data Transfer Objects submitted to the agent
//!
//! DTOs here are written onto the broker exactly as the agent reads them;
//! their field names are part of the wire contract.

pub mod job;
