//! Job domain types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Terminal state reported by the agent in a result envelope
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobState {
    Success,
    Error,
    Killed,
    Timeout,
    UnknownCmd,
    DuplicateId,
    /// A state string this client does not know about
    Other(String),
}

impl JobState {
    pub fn as_str(&self) -> &str {
        match self {
            JobState::Success => "SUCCESS",
            JobState::Error => "ERROR",
            JobState::Killed => "KILLED",
            JobState::Timeout => "TIMEOUT",
            JobState::UnknownCmd => "UNKNOWN_CMD",
            JobState::DuplicateId => "DUPLICATE_ID",
            JobState::Other(state) => state,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobState::Success)
    }
}

impl From<String> for JobState {
    fn from(state: String) -> Self {
        match state.as_str() {
            "SUCCESS" => JobState::Success,
            "ERROR" => JobState::Error,
            "KILLED" => JobState::Killed,
            "TIMEOUT" => JobState::Timeout,
            "UNKNOWN_CMD" => JobState::UnknownCmd,
            "DUPLICATE_ID" => JobState::DuplicateId,
            _ => JobState::Other(state),
        }
    }
}

impl From<JobState> for String {
    fn from(state: JobState) -> Self {
        match state {
            JobState::Other(state) => state,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle phase of a job as seen through its broker flag
///
/// A job that never existed and one whose retention window has passed look
/// the same to the broker, so both are reported as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    /// No flag present
    Unknown,
    /// Flag present without expiry: the agent is still running the job
    Running,
    /// Flag present with expiry: a result exists until the flag expires
    Finished { expires_in: Duration },
}

impl JobPhase {
    /// Derives the phase from the flag's presence and remaining time to live
    pub fn from_flag(exists: bool, ttl: Option<Duration>) -> Self {
        match (exists, ttl) {
            (false, _) => JobPhase::Unknown,
            (true, None) => JobPhase::Running,
            (true, Some(expires_in)) => JobPhase::Finished { expires_in },
        }
    }
}

impl std::fmt::Display for JobPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobPhase::Unknown => write!(f, "Unknown"),
            JobPhase::Running => write!(f, "Running"),
            JobPhase::Finished { expires_in } => {
                write!(f, "Finished (expires in {}s)", expires_in.as_secs())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_wire_names() {
        let state: JobState = serde_json::from_str("\"DUPLICATE_ID\"").unwrap();
        assert_eq!(state, JobState::DuplicateId);
        assert_eq!(serde_json::to_string(&JobState::UnknownCmd).unwrap(), "\"UNKNOWN_CMD\"");
    }

    #[test]
    fn test_unknown_state_is_preserved() {
        let state: JobState = serde_json::from_str("\"PAUSED\"").unwrap();
        assert_eq!(state, JobState::Other("PAUSED".to_string()));
        assert_eq!(serde_json::to_string(&state).unwrap(), "\"PAUSED\"");
        assert!(!state.is_success());
    }

    #[test]
    fn test_phase_from_flag() {
        assert_eq!(JobPhase::from_flag(false, None), JobPhase::Unknown);
        assert_eq!(
            JobPhase::from_flag(false, Some(Duration::from_secs(3))),
            JobPhase::Unknown
        );
        assert_eq!(JobPhase::from_flag(true, None), JobPhase::Running);
        assert_eq!(
            JobPhase::from_flag(true, Some(Duration::from_secs(300))),
            JobPhase::Finished {
                expires_in: Duration::from_secs(300)
            }
        );
    }
}
