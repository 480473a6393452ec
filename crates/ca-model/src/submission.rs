use std::{collections::BTreeMap, path::PathBuf};

use serde::{Deserialize, Serialize};

#[cfg(feature = "schema")]
use schemars::JsonSchema;

use crate::{MappedParameters, RemoteJobId, SubmissionId};

/// Script files attached to a job submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct JobScriptFiles {
    /// Relative path (key of `files`) of the script handed to the resource manager.
    pub main_file_path: String,
    /// Relative path → file content.
    #[serde(default)]
    pub files: BTreeMap<String, String>,
}

impl JobScriptFiles {
    /// Content of the main script, if it is present and not blank.
    pub fn main_script(&self) -> Option<&str> {
        self.files
            .get(&self.main_file_path)
            .map(String::as_str)
            .filter(|s| !s.trim().is_empty())
    }
}

/// A job-management record awaiting dispatch to the resource manager.
///
/// Read-only to the agent; unknown JSON fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct PendingSubmission {
    pub id: SubmissionId,
    /// Submission name; default job name and output file stem.
    #[serde(rename = "job_submission_name")]
    pub name: String,
    /// Identity of the submitting user, resolved to a cluster username.
    #[serde(rename = "job_submission_owner_email")]
    pub owner_email: String,
    /// Directory the job is submitted from; agent default when absent.
    #[serde(default)]
    pub execution_directory: Option<PathBuf>,
    /// Caller-supplied overrides keyed by wire field name.
    #[serde(default)]
    pub execution_parameters: MappedParameters,
    #[serde(rename = "job_script_files")]
    pub script_files: JobScriptFiles,
}

/// A pending record as fetched from the job-management service.
///
/// `Malformed` keeps the id of a record whose remaining fields could not be
/// decoded, so that it can still be rejected with the decode error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingRecord {
    Valid(PendingSubmission),
    Malformed { id: SubmissionId, reason: String },
}

impl PendingRecord {
    pub fn id(&self) -> SubmissionId {
        match self {
            PendingRecord::Valid(sub) => sub.id,
            PendingRecord::Malformed { id, .. } => *id,
        }
    }
}

impl From<PendingSubmission> for PendingRecord {
    fn from(sub: PendingSubmission) -> Self {
        PendingRecord::Valid(sub)
    }
}

/// A submission that the resource manager accepted and that is not finished yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct ActiveSubmission {
    pub id: SubmissionId,
    #[serde(rename = "slurm_job_id")]
    pub remote_job_id: RemoteJobId,
}

/// Result of dispatching a single pending submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Submitted(RemoteJobId),
    Rejected(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_json(main: &str) -> String {
        serde_json::json!({
            "id": 7,
            "job_submission_name": "sub",
            "job_submission_owner_email": "user@example.com",
            "job_script_name": "ignored",
            "execution_parameters": {"partition": "debug"},
            "job_script_files": {
                "main_file_path": "application.sh",
                "files": {"application.sh": main}
            }
        })
        .to_string()
    }

    #[test]
    fn deserializes_wire_names_and_ignores_unknown_fields() {
        let sub: PendingSubmission = serde_json::from_str(&pending_json("#!/bin/bash\n")).unwrap();

        assert_eq!(sub.id, SubmissionId(7));
        assert_eq!(sub.name, "sub");
        assert_eq!(sub.owner_email, "user@example.com");
        assert!(sub.execution_directory.is_none());
        assert_eq!(sub.execution_parameters.len(), 1);
        assert_eq!(sub.script_files.main_script(), Some("#!/bin/bash\n"));
    }

    #[test]
    fn tolerates_null_and_float_overrides() {
        let json = serde_json::json!({
            "id": 9,
            "job_submission_name": "sub",
            "job_submission_owner_email": "user@example.com",
            "execution_parameters": {"nice": null, "ratio": 1.5, "partition": "debug"},
            "job_script_files": {"main_file_path": "a.sh", "files": {"a.sh": "x"}}
        });
        let sub: PendingSubmission = serde_json::from_value(json).unwrap();
        assert_eq!(sub.execution_parameters.len(), 3);
    }

    #[test]
    fn blank_main_script_is_absent() {
        let sub: PendingSubmission = serde_json::from_str(&pending_json("  \n")).unwrap();
        assert_eq!(sub.script_files.main_script(), None);

        let missing = JobScriptFiles {
            main_file_path: "other.sh".into(),
            files: BTreeMap::new(),
        };
        assert_eq!(missing.main_script(), None);
    }

    #[test]
    fn active_submission_reads_slurm_job_id() {
        let active: ActiveSubmission =
            serde_json::from_str(r#"{"id": 3, "slurm_job_id": 1234}"#).unwrap();
        assert_eq!(active.remote_job_id, RemoteJobId(1234));
    }
}
