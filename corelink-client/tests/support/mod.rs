//! Test harness: a scripted agent running against an in-memory broker.
//!
//! The agent takes jobs from `core:default` the way the real one does: it
//! raises the job flag, runs the command, writes the result, and leaves the
//! flag and result to expire after the retention window.
//!
//! Commands understood by the fake agent:
//! - `echo.test`, `core.ping`, `job.*`: succeed with their arguments as JSON
//! - `test.sleep {seconds}`: succeed with text output after sleeping
//! - `test.hang`: never finish
//! - `test.fail {exit}`: fail with a process exit code
//! - `test.stream {messages: [[level, text, flag], ...]}`: emit live output
//! - `core.subscribe {id}`: emit one attach line then end the stream

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use corelink_client::{BrokerGateway, DispatchClient, MemoryBroker};
use corelink_core::domain::stream::{FLAG_EOF_SUCCESS, LEVEL_STDOUT, StreamMessage};
use corelink_core::dto::job::JobEnvelope;
use corelink_core::keys;
use serde_json::{Value, json};
use tokio::task::JoinHandle;

/// Retention window for finished jobs
pub const RETENTION: Duration = Duration::from_secs(300);

/// Handle to a running fake agent
pub struct TestAgent {
    pub broker: Arc<MemoryBroker>,
    handle: JoinHandle<()>,
}

impl TestAgent {
    /// Spawn an agent over a fresh broker
    pub fn spawn() -> Self {
        let broker = Arc::new(MemoryBroker::new());
        let handle = tokio::spawn(agent_loop(broker.clone()));
        Self { broker, handle }
    }

    /// Client sharing this agent's broker
    pub fn client(&self) -> DispatchClient {
        DispatchClient::new(self.broker.clone())
    }
}

impl Drop for TestAgent {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn agent_loop(broker: Arc<MemoryBroker>) {
    loop {
        let raw = match broker
            .block_pop(keys::DEFAULT_QUEUE, Duration::from_secs(10))
            .await
        {
            Ok(Some(raw)) => raw,
            Ok(None) => continue,
            Err(_) => return,
        };
        let Ok(job) = JobEnvelope::decode(&raw) else {
            continue;
        };

        let flag = keys::result_flag(&job.id);
        if broker.len(&flag) > 0 {
            // The original job keeps its flag; only the result list is touched.
            let queue = keys::result_queue(&job.id);
            broker.push(&queue, result(&job.id, "DUPLICATE_ID", 0, "", 409).to_string());
            continue;
        }
        broker.push(&flag, "1");

        tokio::spawn(run_job(broker.clone(), job));
    }
}

async fn run_job(broker: Arc<MemoryBroker>, job: JobEnvelope) {
    let id = job.id.clone();
    let work = execute(&broker, &job);

    let outcome = match job.max_time {
        Some(seconds) => match tokio::time::timeout(Duration::from_secs(seconds), work).await {
            Ok(outcome) => outcome,
            Err(_) => result(&id, "KILLED", 0, "", 500),
        },
        None => work.await,
    };

    finish(&broker, &id, outcome);
}

async fn execute(broker: &MemoryBroker, job: &JobEnvelope) -> Value {
    let id = job.id.as_str();
    match job.command.as_str() {
        "echo.test" | "core.ping" | "job.list" | "job.kill" | "job.unschedule" => {
            tokio::time::sleep(Duration::from_millis(100)).await;
            result(id, "SUCCESS", 20, &job.arguments.to_string(), 200)
        }
        "test.sleep" => {
            let seconds = job.arguments["seconds"].as_u64().unwrap_or(1);
            tokio::time::sleep(Duration::from_secs(seconds)).await;
            result(id, "SUCCESS", 1, "slept", 200)
        }
        "test.hang" => std::future::pending::<Value>().await,
        "test.fail" => {
            let exit = job.arguments["exit"].as_i64().unwrap_or(1);
            result(id, "ERROR", 1, "command failed", 1000 + exit)
        }
        "test.stream" => {
            let stream = keys::stream_queue(id);
            let messages = job.arguments["messages"].as_array().cloned().unwrap_or_default();
            for message in messages {
                tokio::time::sleep(Duration::from_millis(50)).await;
                let level = message[0].as_u64().unwrap_or(1) as u16;
                let text = message[1].as_str().unwrap_or_default();
                let flag = message[2].as_u64().unwrap_or(0) as u8;
                broker.push(&stream, StreamMessage::new(text, level, flag).encode());
            }
            result(id, "SUCCESS", 1, "", 200)
        }
        "core.subscribe" => {
            let target = job.arguments["id"].as_str().unwrap_or_default();
            broker.push(
                &keys::stream_queue(id),
                StreamMessage::new(
                    format!("attached to {}\n", target),
                    LEVEL_STDOUT,
                    FLAG_EOF_SUCCESS,
                )
                .encode(),
            );
            result(id, "SUCCESS", 20, "null", 200)
        }
        _ => result(id, "UNKNOWN_CMD", 0, "unknown command", 404),
    }
}

fn result(id: &str, state: &str, level: i64, data: &str, code: i64) -> Value {
    json!({
        "id": id,
        "state": state,
        "level": level,
        "data": data,
        "code": code,
        "starttime": 1_700_000_000_000i64,
        "time": 100,
        "streams": ["", ""],
    })
}

/// Publishes the result and starts the retention countdown
fn finish(broker: &MemoryBroker, id: &str, outcome: Value) {
    let queue = keys::result_queue(id);
    broker.push(&queue, outcome.to_string());
    broker.expire(&queue, RETENTION);
    broker.expire(&keys::result_flag(id), RETENTION);
}
