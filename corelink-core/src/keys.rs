//! Broker key layout shared with the remote agent
//!
//! These names are part of the wire contract and must not change.

/// List the agent pops submitted job envelopes from
pub const DEFAULT_QUEUE: &str = "core:default";

/// Result list for a job: `result:<id>`
pub fn result_queue(id: &str) -> String {
    format!("result:{}", id)
}

/// Acceptance and retention flag for a job: `result:<id>:flag`
pub fn result_flag(id: &str) -> String {
    format!("result:{}:flag", id)
}

/// Live output list for a job: `stream:<id>`
pub fn stream_queue(id: &str) -> String {
    format!("stream:{}", id)
}
