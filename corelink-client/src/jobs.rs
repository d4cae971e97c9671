//! Job management commands
//!
//! These run as ordinary jobs on the agent and return its JSON answer.

use corelink_core::dto::job::DispatchRequest;
use serde_json::{Value, json};

use crate::DispatchClient;
use crate::error::Result;

/// Default signal sent by [`JobManager::kill`]
pub const SIGTERM: i32 = 15;

/// Manages jobs running on the agent
///
/// Obtained from [`DispatchClient::jobs`].
#[derive(Debug)]
pub struct JobManager<'a> {
    client: &'a DispatchClient,
}

impl<'a> JobManager<'a> {
    pub(crate) fn new(client: &'a DispatchClient) -> Self {
        Self { client }
    }

    /// List running jobs, or a single job when `id` is given
    pub async fn list(&self, id: Option<&str>) -> Result<Value> {
        self.client
            .dispatch_and_decode(DispatchRequest::new("job.list", json!({ "id": id })))
            .await
    }

    /// Send `signal` to a running job
    pub async fn kill(&self, id: &str, signal: i32) -> Result<Value> {
        self.client
            .dispatch_and_decode(DispatchRequest::new(
                "job.kill",
                json!({ "id": id, "signal": signal }),
            ))
            .await
    }

    /// Stop a recurring job from being restarted
    ///
    /// A run already in progress is left alone.
    pub async fn unschedule(&self, id: &str) -> Result<Value> {
        self.client
            .dispatch_and_decode(DispatchRequest::new("job.unschedule", json!({ "id": id })))
            .await
    }
}
