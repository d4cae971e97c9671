//! Job envelope DTOs
//!
//! A [`DispatchRequest`] is what callers fill in; [`JobEnvelope`] is the
//! validated record pushed onto the agent queue.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::{DecodeError, EncodeError, SchemaError};

/// Request to dispatch a command to the agent
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRequest {
    pub command: String,
    pub arguments: serde_json::Value,
    /// Jobs sharing a queue name run one after the other
    pub queue: Option<String>,
    /// Server-side kill deadline in seconds
    pub max_time: Option<u64>,
    /// Capture live output on `stream:<id>`
    pub stream: bool,
    pub tags: Option<Vec<String>>,
    /// Generated when `None` or empty
    pub id: Option<String>,
    /// Restart the job this many seconds after it exits
    pub recurring_period: Option<u64>,
}

impl DispatchRequest {
    pub fn new(command: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            command: command.into(),
            arguments,
            queue: None,
            max_time: None,
            stream: false,
            tags: None,
            id: None,
            recurring_period: None,
        }
    }

    pub fn queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = Some(queue.into());
        self
    }

    pub fn max_time(mut self, seconds: u64) -> Self {
        self.max_time = Some(seconds);
        self
    }

    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn recurring_period(mut self, seconds: u64) -> Self {
        self.recurring_period = Some(seconds);
        self
    }

    /// Builds and validates the wire envelope, generating an id if needed
    pub fn into_envelope(self) -> Result<JobEnvelope, SchemaError> {
        let id = match self.id {
            Some(id) if !id.is_empty() => id,
            _ => Uuid::new_v4().to_string(),
        };

        let envelope = JobEnvelope {
            id,
            command: self.command,
            arguments: self.arguments,
            queue: self.queue,
            max_time: self.max_time,
            stream: self.stream,
            tags: self.tags,
            recurring_period: self.recurring_period,
        };
        envelope.validate()?;
        Ok(envelope)
    }
}

/// Job envelope as read by the agent from `core:default`
///
/// Every key is always written; unset options go out as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEnvelope {
    pub id: String,
    pub command: String,
    pub arguments: serde_json::Value,
    pub queue: Option<String>,
    pub max_time: Option<u64>,
    pub stream: bool,
    pub tags: Option<Vec<String>>,
    pub recurring_period: Option<u64>,
}

impl JobEnvelope {
    /// Checks the structural shape of the envelope
    ///
    /// Only presence and shape are checked: ids and commands must be set,
    /// and tags form a set of non-empty strings. Values the agent gives a
    /// meaning to, such as a zero `recurring_period`, pass through.
    pub fn validate(&self) -> Result<(), SchemaError> {
        check_present("id", &self.id)?;
        check_present("command", &self.command)?;

        if self.queue.as_deref() == Some("") {
            return Err(SchemaError::new("queue", "must not be empty when set"));
        }

        if let Some(tags) = &self.tags {
            let mut seen = HashSet::new();
            for tag in tags {
                if tag.is_empty() {
                    return Err(SchemaError::new("tags", "tags must not be empty"));
                }
                if !seen.insert(tag.as_str()) {
                    return Err(SchemaError::new("tags", format!("duplicate tag `{}`", tag)));
                }
            }
        }

        Ok(())
    }

    pub fn encode(&self) -> Result<String, EncodeError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(raw: &str) -> Result<Self, DecodeError> {
        serde_json::from_str(raw).map_err(|e| DecodeError::malformed("job envelope", e))
    }
}

fn check_present(field: &'static str, value: &str) -> Result<(), SchemaError> {
    if value.is_empty() {
        return Err(SchemaError::new(field, "must not be empty"));
    }
    Ok(())
}
