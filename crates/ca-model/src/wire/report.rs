use serde::{Deserialize, Serialize};

use crate::{JobState, RemoteJobId};

/// Body of a job-submission status update sent to the job-management service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub new_status: JobState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slurm_job_id: Option<RemoteJobId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_message: Option<String>,
}

impl StatusUpdate {
    /// Update recording the remote job id of an accepted submission.
    pub fn submitted(remote_job_id: RemoteJobId) -> Self {
        Self {
            new_status: JobState::Submitted,
            slurm_job_id: Some(remote_job_id),
            reported_message: None,
        }
    }

    /// Plain state update; an empty message is omitted.
    pub fn status(state: JobState, message: &str) -> Self {
        Self {
            new_status: state,
            slurm_job_id: None,
            reported_message: (!message.is_empty()).then(|| message.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submitted_body() {
        let body = serde_json::to_value(StatusUpdate::submitted(RemoteJobId(11))).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"new_status": "SUBMITTED", "slurm_job_id": 11})
        );
    }

    #[test]
    fn status_body_skips_empty_message() {
        let body = serde_json::to_value(StatusUpdate::status(JobState::Completed, "")).unwrap();
        assert_eq!(body, serde_json::json!({"new_status": "COMPLETED"}));

        let body = serde_json::to_value(StatusUpdate::status(JobState::Rejected, "boom")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"new_status": "REJECTED", "reported_message": "boom"})
        );
    }
}
