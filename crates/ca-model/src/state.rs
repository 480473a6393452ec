use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[cfg(feature = "schema")]
use schemars::JsonSchema;

use crate::ModelError;

/// Lifecycle state of a job submission as known to the job-management service.
///
/// ```text
/// CREATED ──► SUBMITTED ──► COMPLETED | FAILED
///    │
///    └──────► REJECTED
///
/// any ──────► ABORTED   (bookkeeping could not be completed)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Created,
    Submitted,
    Completed,
    Failed,
    Rejected,
    Aborted,
}

impl JobState {
    /// Returns `true` when no further transition is expected.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::Rejected | JobState::Aborted
        )
    }

    /// Maps a resource-manager job state string to a local state.
    ///
    /// The lookup is total: anything not recognised as finished is still running
    /// from the agent's point of view and maps to [`JobState::Submitted`].
    pub fn from_remote(remote: &str) -> JobState {
        match remote.trim().to_ascii_uppercase().as_str() {
            "COMPLETED" => JobState::Completed,
            "FAILED" | "TIMEOUT" | "CANCELLED" | "NODE_FAIL" | "OUT_OF_MEMORY" | "BOOT_FAIL"
            | "DEADLINE" | "PREEMPTED" => JobState::Failed,
            _ => JobState::Submitted,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Created => "CREATED",
            JobState::Submitted => "SUBMITTED",
            JobState::Completed => "COMPLETED",
            JobState::Failed => "FAILED",
            JobState::Rejected => "REJECTED",
            JobState::Aborted => "ABORTED",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobState {
    type Err = ModelError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CREATED" => Ok(JobState::Created),
            "SUBMITTED" => Ok(JobState::Submitted),
            "COMPLETED" => Ok(JobState::Completed),
            "FAILED" => Ok(JobState::Failed),
            "REJECTED" => Ok(JobState::Rejected),
            "ABORTED" => Ok(JobState::Aborted),
            _ => Err(ModelError::UnknownState(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!JobState::Created.is_terminal());
        assert!(!JobState::Submitted.is_terminal());
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::Rejected.is_terminal());
        assert!(JobState::Aborted.is_terminal());
    }

    #[test]
    fn remote_lookup_is_total_with_running_default() {
        assert_eq!(JobState::from_remote("COMPLETED"), JobState::Completed);
        assert_eq!(JobState::from_remote("FAILED"), JobState::Failed);
        assert_eq!(JobState::from_remote("TIMEOUT"), JobState::Failed);
        assert_eq!(JobState::from_remote("cancelled"), JobState::Failed);

        for running in ["PENDING", "RUNNING", "SUSPENDED", "", "SOMETHING_NEW"] {
            assert_eq!(JobState::from_remote(running), JobState::Submitted, "{running:?}");
        }
    }

    #[test]
    fn serializes_screaming_case() {
        let json = serde_json::to_string(&JobState::Submitted).unwrap();
        assert_eq!(json, r#""SUBMITTED""#);

        let back: JobState = serde_json::from_str(r#""ABORTED""#).unwrap();
        assert_eq!(back, JobState::Aborted);
    }

    #[test]
    fn from_str_rejects_unknown() {
        assert_eq!("completed".parse::<JobState>().unwrap(), JobState::Completed);
        assert!(matches!(
            "DONE".parse::<JobState>(),
            Err(ModelError::UnknownState(_))
        ));
    }
}
