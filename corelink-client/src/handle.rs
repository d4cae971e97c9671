//! Job handles
//!
//! A [`JobHandle`] names a submitted job. It holds no job state of its own:
//! liveness and results are read from the broker on every call, so a handle
//! can be rebuilt from an id at any time and dropping one never touches the
//! job.

use std::sync::Arc;
use std::time::Duration;

use corelink_core::domain::job::JobPhase;
use corelink_core::domain::result::{DEFAULT_CODE, LEVEL_JSON, ResultValue};
use corelink_core::domain::stream::StreamMessage;
use corelink_core::{DecodeError, keys};
use serde::de::DeserializeOwned;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::broker::BrokerGateway;
use crate::error::{ClientError, Result};
use crate::sink::StdioSink;

/// Longest single blocking wait on the broker
pub const POLL_SLICE: Duration = Duration::from_secs(10);

/// Handle to a job known (or once known) to the broker
#[derive(Clone)]
pub struct JobHandle {
    id: String,
    queue: String,
    broker: Arc<dyn BrokerGateway>,
    default_timeout: Duration,
}

impl std::fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobHandle")
            .field("id", &self.id)
            .field("queue", &self.queue)
            .finish()
    }
}

impl JobHandle {
    pub(crate) fn new(
        id: impl Into<String>,
        broker: Arc<dyn BrokerGateway>,
        default_timeout: Duration,
    ) -> Self {
        let id = id.into();
        Self {
            queue: keys::result_queue(&id),
            id,
            broker,
            default_timeout,
        }
    }

    /// Job ID
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Result list key, `result:<id>`
    pub fn result_queue(&self) -> &str {
        &self.queue
    }

    fn flag(&self) -> String {
        keys::result_flag(&self.id)
    }

    /// True while the job runs or its result is still retained
    ///
    /// A finished job stays known for about five minutes; after that its
    /// result can no longer be fetched.
    pub async fn exists(&self) -> Result<bool> {
        Ok(self.broker.exists_flag(&self.flag()).await?)
    }

    /// True while the job is still running
    pub async fn running(&self) -> Result<bool> {
        Ok(self.state().await? == JobPhase::Running)
    }

    /// Current lifecycle phase of the job
    pub async fn state(&self) -> Result<JobPhase> {
        let flag = self.flag();
        if !self.broker.exists_flag(&flag).await? {
            return Ok(JobPhase::Unknown);
        }
        let ttl = self.broker.ttl(&flag).await?;
        Ok(JobPhase::from_flag(true, ttl))
    }

    /// Waits for the job to finish and returns its result
    ///
    /// `timeout` is a client-side wait (the configured default when `None`)
    /// and is unrelated to the job's own `max_time`, which makes the agent
    /// kill the job. Once a job has finished, every call returns the same
    /// result until the broker forgets the job.
    ///
    /// # Errors
    /// - `JobNotFound` if the broker stops tracking the job before a result
    ///   shows up
    /// - `Timeout` if the budget runs out first; the job may still be running
    pub async fn get(&self, timeout: Option<Duration>) -> Result<ResultValue> {
        let budget = timeout.unwrap_or(self.default_timeout);
        let start = Instant::now();
        let mut remaining = budget;

        while !remaining.is_zero() {
            if !self.exists().await? {
                return Err(ClientError::JobNotFound(self.id.clone()));
            }

            let slice = remaining.min(POLL_SLICE);
            if let Some(raw) = self.broker.block_pop_rotate(&self.queue, slice).await? {
                let result = ResultValue::parse(raw)?;
                debug!(
                    "{} << {}, stdout={:?}, stderr={:?}, data={:?}",
                    self.id,
                    result.state(),
                    result.stdout(),
                    result.stderr(),
                    truncate(result.data(), 1000)
                );
                return Ok(result);
            }

            debug!(
                "{} still waiting ({}s)",
                self.id,
                start.elapsed().as_secs()
            );
            remaining = remaining.saturating_sub(slice);
        }

        Err(ClientError::Timeout {
            id: self.id.clone(),
            waited: budget,
        })
    }

    /// Waits for the job and decodes its JSON result
    ///
    /// # Errors
    /// In addition to the errors of [`JobHandle::get`]:
    /// - `RemoteExecution` if the job did not succeed
    /// - `Decode` if the result is not JSON (level 20) or fails to parse
    pub async fn get_json<T: DeserializeOwned>(&self, timeout: Option<Duration>) -> Result<T> {
        let result = self.get(timeout).await?;
        decode_success(&result)
    }

    /// Copies the job's live output to stdout and stderr until it ends
    ///
    /// See [`JobHandle::stream_with`].
    pub async fn stream(&self) -> Result<usize> {
        let mut sink = StdioSink::stdio();
        self.stream_with(|level, message, flag| sink.write(level, message, flag))
            .await
    }

    /// Feeds the job's live output to `callback` until it ends
    ///
    /// The job must have been dispatched with `stream` set. The callback gets
    /// `(level, message, flag)` for every message; a flag with `0x2` (success)
    /// or `0x4` (error) marks the last one. Without such a marker the call
    /// returns once the stream is empty and the job is no longer running.
    ///
    /// There is no overall timeout and no way to cancel the job from here;
    /// drop the future to stop reading. Returns the number of messages
    /// delivered.
    pub async fn stream_with<F>(&self, mut callback: F) -> Result<usize>
    where
        F: FnMut(u16, &str, u8) + Send,
    {
        let key = keys::stream_queue(&self.id);
        let mut count = 0;

        loop {
            match self.broker.block_pop(&key, POLL_SLICE).await? {
                None => {
                    if !self.running().await? {
                        debug!("{} stream closed, job no longer running", self.id);
                        break;
                    }
                }
                Some(raw) => {
                    let message = StreamMessage::decode(&raw)?;
                    callback(message.level(), &message.message, message.flag());
                    count += 1;
                    if message.is_eof() {
                        debug!("{} stream reached end after {} message(s)", self.id, count);
                        break;
                    }
                }
            }
        }

        Ok(count)
    }
}

/// Decodes a JSON result, rejecting failed or non-JSON results
pub(crate) fn decode_success<T: DeserializeOwned>(result: &ResultValue) -> Result<T> {
    if !result.is_success() {
        return Err(remote_failure(result));
    }
    if result.level() != LEVEL_JSON {
        return Err(DecodeError::UnexpectedLevel {
            expected: LEVEL_JSON,
            actual: result.level(),
        }
        .into());
    }
    Ok(result.payload().decode()?)
}

/// Error for a job that finished in any state but SUCCESS
pub(crate) fn remote_failure(result: &ResultValue) -> ClientError {
    if result.reported_code().is_none() {
        warn!(
            "{} finished {} without a code, reporting {}",
            result.id(),
            result.state(),
            DEFAULT_CODE
        );
    }
    ClientError::remote(result.data(), result.code())
}

fn truncate(data: &str, max: usize) -> &str {
    match data.char_indices().nth(max) {
        Some((index, _)) => &data[..index],
        None => data,
    }
}
