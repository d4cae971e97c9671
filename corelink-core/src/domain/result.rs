//! Result domain types
//!
//! The agent pushes one result envelope per job onto `result:<id>`. The
//! envelope is terminal: once it exists, every read returns the same bytes
//! until the broker forgets the job.

use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::job::JobState;
use crate::error::{DecodeError, ResultError};

/// Level tag marking result data as a JSON document
pub const LEVEL_JSON: i64 = 20;

/// Code reported when the envelope carries none
pub const DEFAULT_CODE: i64 = 500;

/// Codes at or above this offset carry a process exit code
pub const PROCESS_EXIT_OFFSET: i64 = 1000;

/// Status code used when a result is not a JSON response
const NOT_ACCEPTABLE: i64 = 406;

/// Result envelope as written by the agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub id: String,
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub level: i64,
    pub state: JobState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    /// Milliseconds since the epoch
    #[serde(default)]
    pub starttime: i64,
    /// Elapsed milliseconds
    #[serde(default)]
    pub time: i64,
    #[serde(default)]
    pub streams: Option<Vec<String>>,
}

/// Exit classification of a result code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Exit code of the underlying process (`code - 1000`)
    Process(i64),
    /// HTTP-style status defined by the command catalog
    Status(i64),
}

impl ExitStatus {
    pub fn from_code(code: i64) -> Self {
        if code >= PROCESS_EXIT_OFFSET {
            ExitStatus::Process(code - PROCESS_EXIT_OFFSET)
        } else {
            ExitStatus::Status(code)
        }
    }
}

/// Result data, split by its level tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload<'a> {
    /// Opaque text at any non-JSON level
    Text { level: i64, data: &'a str },
    /// A JSON document (level 20)
    Structured(&'a str),
}

impl<'a> Payload<'a> {
    pub fn new(level: i64, data: &'a str) -> Self {
        if level == LEVEL_JSON {
            Payload::Structured(data)
        } else {
            Payload::Text { level, data }
        }
    }

    pub fn as_str(&self) -> &'a str {
        match self {
            Payload::Text { data, .. } => data,
            Payload::Structured(data) => data,
        }
    }

    /// Decodes a structured payload; text payloads are rejected
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        match self {
            Payload::Structured(data) => serde_json::from_str(data)
                .map_err(|e| DecodeError::malformed("result data", e)),
            Payload::Text { level, .. } => Err(DecodeError::UnexpectedLevel {
                expected: LEVEL_JSON,
                actual: *level,
            }),
        }
    }
}

/// Read-only view over a retrieved result envelope
///
/// Keeps the raw bytes it was parsed from, so repeated reads of the same job
/// can be compared byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultValue {
    raw: String,
    envelope: ResultEnvelope,
}

impl ResultValue {
    /// Parses a raw result envelope
    pub fn parse(raw: impl Into<String>) -> Result<Self, DecodeError> {
        let raw = raw.into();
        let envelope = serde_json::from_str(&raw)
            .map_err(|e| DecodeError::malformed("result envelope", e))?;
        Ok(Self { raw, envelope })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn envelope(&self) -> &ResultEnvelope {
        &self.envelope
    }

    pub fn id(&self) -> &str {
        &self.envelope.id
    }

    pub fn data(&self) -> &str {
        &self.envelope.data
    }

    pub fn level(&self) -> i64 {
        self.envelope.level
    }

    pub fn state(&self) -> &JobState {
        &self.envelope.state
    }

    pub fn is_success(&self) -> bool {
        self.envelope.state.is_success()
    }

    /// Result code, 500 when the agent reported none
    ///
    /// A missing code means the agent broke the protocol; use
    /// [`ResultValue::reported_code`] to tell the two apart.
    pub fn code(&self) -> i64 {
        self.envelope.code.unwrap_or(DEFAULT_CODE)
    }

    /// Result code exactly as found on the wire
    pub fn reported_code(&self) -> Option<i64> {
        self.envelope.code
    }

    pub fn exit(&self) -> ExitStatus {
        ExitStatus::from_code(self.code())
    }

    pub fn stdout(&self) -> &str {
        self.stream(0)
    }

    pub fn stderr(&self) -> &str {
        self.stream(1)
    }

    fn stream(&self, index: usize) -> &str {
        self.envelope
            .streams
            .as_ref()
            .and_then(|streams| streams.get(index))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Start time in milliseconds since the epoch
    pub fn starttime_ms(&self) -> i64 {
        self.envelope.starttime
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.envelope.starttime).single()
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.envelope.time.max(0) as u64)
    }

    pub fn payload(&self) -> Payload<'_> {
        Payload::new(self.envelope.level, &self.envelope.data)
    }

    /// Views this result as a successful JSON result
    pub fn into_json(self) -> Result<JsonResultValue, ResultError> {
        if !self.is_success() {
            return Err(ResultError::new(self.data(), self.code()));
        }
        if self.level() != LEVEL_JSON {
            return Err(ResultError::new(
                format!("not a json response: {}", self.level()),
                NOT_ACCEPTABLE,
            ));
        }
        Ok(JsonResultValue { result: self })
    }
}

impl std::fmt::Display for ResultValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "STATE: {} {}", self.code(), self.state())?;
        writeln!(f, "STDOUT:")?;
        writeln!(f, "{}", self.stdout())?;
        writeln!(f, "STDERR:")?;
        writeln!(f, "{}", self.stderr())?;
        writeln!(f, "DATA:")?;
        write!(f, "{}", self.data())
    }
}

/// A successful result whose data is a JSON document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonResultValue {
    result: ResultValue,
}

impl JsonResultValue {
    pub fn result(&self) -> &ResultValue {
        &self.result
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        self.result.payload().decode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(value: serde_json::Value) -> ResultValue {
        ResultValue::parse(value.to_string()).unwrap()
    }

    #[test]
    fn test_parse_full_envelope() {
        let result = envelope(json!({
            "id": "job-1",
            "data": "{\"a\":1}",
            "level": 20,
            "state": "SUCCESS",
            "code": 200,
            "starttime": 1_700_000_000_000i64,
            "time": 1500,
            "streams": ["out", "err"],
        }));

        assert_eq!(result.id(), "job-1");
        assert!(result.is_success());
        assert_eq!(result.code(), 200);
        assert_eq!(result.exit(), ExitStatus::Status(200));
        assert_eq!(result.stdout(), "out");
        assert_eq!(result.stderr(), "err");
        assert_eq!(result.elapsed(), Duration::from_millis(1500));
        assert_eq!(
            result.started_at().map(|t| t.timestamp()),
            Some(1_700_000_000)
        );
    }

    #[test]
    fn test_missing_code_defaults_to_500() {
        let result = envelope(json!({"id": "x", "state": "ERROR", "data": "boom"}));
        assert_eq!(result.code(), DEFAULT_CODE);
        assert_eq!(result.reported_code(), None);
    }

    #[test]
    fn test_process_exit_code() {
        let result = envelope(json!({"id": "x", "state": "ERROR", "code": 1002}));
        assert_eq!(result.exit(), ExitStatus::Process(2));
        assert_eq!(ExitStatus::from_code(999), ExitStatus::Status(999));
        assert_eq!(ExitStatus::from_code(1000), ExitStatus::Process(0));
    }

    #[test]
    fn test_missing_streams_are_empty() {
        let result = envelope(json!({"id": "x", "state": "SUCCESS"}));
        assert_eq!(result.stdout(), "");
        assert_eq!(result.stderr(), "");

        let result = envelope(json!({"id": "x", "state": "SUCCESS", "streams": ["only"]}));
        assert_eq!(result.stdout(), "only");
        assert_eq!(result.stderr(), "");
    }

    #[test]
    fn test_payload_decode_only_on_structured() {
        let result = envelope(json!({"id": "x", "state": "SUCCESS", "level": 20, "data": "[1,2]"}));
        let decoded: Vec<u32> = result.payload().decode().unwrap();
        assert_eq!(decoded, vec![1, 2]);

        let text = envelope(json!({"id": "x", "state": "SUCCESS", "level": 1, "data": "[1,2]"}));
        let err = text.payload().decode::<Vec<u32>>().unwrap_err();
        assert!(matches!(
            err,
            DecodeError::UnexpectedLevel {
                expected: 20,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_malformed_structured_payload() {
        let result = envelope(json!({"id": "x", "state": "SUCCESS", "level": 20, "data": "{oops"}));
        assert!(matches!(
            result.payload().decode::<serde_json::Value>(),
            Err(DecodeError::Malformed { .. })
        ));
    }

    #[test]
    fn test_into_json_requires_success_and_level() {
        let failed = envelope(json!({"id": "x", "state": "ERROR", "level": 20, "data": "bad", "code": 1001}));
        let err = failed.into_json().unwrap_err();
        assert_eq!(err, ResultError::new("bad", 1001));

        let text = envelope(json!({"id": "x", "state": "SUCCESS", "level": 1, "data": "hi"}));
        let err = text.into_json().unwrap_err();
        assert_eq!(err.code, 406);

        let ok = envelope(json!({"id": "x", "state": "SUCCESS", "level": 20, "data": "{\"k\":\"v\"}"}));
        let json = ok.into_json().unwrap();
        assert_eq!(json.decode::<serde_json::Value>().unwrap(), json!({"k": "v"}));
    }

    #[test]
    fn test_raw_bytes_are_kept() {
        let raw = r#"{"id":"x","state":"SUCCESS","data":"","level":0}"#;
        let result = ResultValue::parse(raw).unwrap();
        assert_eq!(result.raw(), raw);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            ResultValue::parse("not json"),
            Err(DecodeError::Malformed { .. })
        ));
    }

    #[test]
    fn test_display_lists_channels() {
        let result = envelope(json!({
            "id": "x", "state": "SUCCESS", "code": 200,
            "data": "d", "streams": ["o", "e"],
        }));
        let rendered = result.to_string();
        assert!(rendered.starts_with("STATE: 200 SUCCESS\n"));
        assert!(rendered.contains("STDOUT:\no\n"));
        assert!(rendered.contains("STDERR:\ne\n"));
        assert!(rendered.ends_with("DATA:\nd"));
    }
}
