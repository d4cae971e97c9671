//! Job dispatch

use std::time::Duration;

use corelink_core::domain::result::ResultValue;
use corelink_core::dto::job::DispatchRequest;
use corelink_core::keys;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};

use crate::DispatchClient;
use crate::error::Result;
use crate::handle::{JobHandle, decode_success, remote_failure};

/// How long `dispatch` waits for the agent to start tracking a job
pub const ACCEPT_TIMEOUT: Duration = Duration::from_secs(10);

impl DispatchClient {
    // =============================================================================
    // Submission
    // =============================================================================

    /// Submit a job and return its handle
    ///
    /// After pushing the envelope, waits up to ten seconds for the agent to
    /// raise the job's flag. If it does not, the handle is returned anyway:
    /// a later `get()` reports whether the job really went missing.
    ///
    /// # Errors
    /// - `Schema` or `Encode` if the envelope is invalid; nothing is sent
    /// - `Broker` on transport failure
    ///
    /// # Example
    /// ```no_run
    /// # use corelink_client::{DispatchClient, MemoryBroker};
    /// # use corelink_core::dto::job::DispatchRequest;
    /// # use std::sync::Arc;
    /// # async fn example() -> anyhow::Result<()> {
    /// let client = DispatchClient::new(Arc::new(MemoryBroker::new()));
    /// let job = client
    ///     .dispatch(
    ///         DispatchRequest::new("bash", serde_json::json!({"script": "make", "stdin": ""}))
    ///             .max_time(600)
    ///             .stream(true),
    ///     )
    ///     .await?;
    /// job.stream().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn dispatch(&self, request: DispatchRequest) -> Result<JobHandle> {
        let envelope = request.into_envelope()?;
        let id = envelope.id.clone();

        self.broker
            .enqueue(keys::DEFAULT_QUEUE, envelope.encode()?)
            .await?;

        let flag = keys::result_flag(&id);
        if self
            .broker
            .block_pop_rotate(&flag, ACCEPT_TIMEOUT)
            .await?
            .is_none()
        {
            warn!("Job {} not accepted within {:?}", id, ACCEPT_TIMEOUT);
        }

        debug!("{} >> {}({})", id, envelope.command, envelope.arguments);

        Ok(self.response_for(id))
    }

    /// Submit a job and wait for its result
    ///
    /// Waits for the client's default timeout.
    ///
    /// # Errors
    /// - `RemoteExecution` if the job finished in any state but SUCCESS
    /// - every error of [`DispatchClient::dispatch`] and [`JobHandle::get`]
    pub async fn dispatch_and_wait(&self, request: DispatchRequest) -> Result<ResultValue> {
        let handle = self.dispatch(request).await?;
        let result = handle.get(None).await?;

        if !result.is_success() {
            return Err(remote_failure(&result));
        }

        Ok(result)
    }

    /// Submit a job, wait for it, and decode its JSON result
    ///
    /// # Errors
    /// - `Decode` if the result is not JSON (level 20) or does not parse as `T`
    /// - every error of [`DispatchClient::dispatch_and_wait`]
    pub async fn dispatch_and_decode<T: DeserializeOwned>(
        &self,
        request: DispatchRequest,
    ) -> Result<T> {
        let result = self.dispatch_and_wait(request).await?;
        decode_success(&result)
    }

    // =============================================================================
    // Agent Commands
    // =============================================================================

    /// Check that the agent is reachable and answering
    pub async fn ping(&self) -> Result<serde_json::Value> {
        self.dispatch_and_decode(DispatchRequest::new("core.ping", json!({})))
            .await
    }

    /// Subscribe to the live output of another job
    ///
    /// Returns the subscription's own handle; call `stream()` on it to read a
    /// copy of the job's output. Every subscription gets its own copy, and
    /// ending a subscription does not affect the job. Pass an `id` to be able
    /// to reattach to the same subscription later with
    /// [`DispatchClient::response_for`].
    pub async fn subscribe(&self, job_id: &str, id: Option<String>) -> Result<JobHandle> {
        let mut request =
            DispatchRequest::new("core.subscribe", json!({ "id": job_id })).stream(true);
        if let Some(id) = id {
            request = request.id(id);
        }
        self.dispatch(request).await
    }
}
