use serde::{Deserialize, Serialize};

use crate::{MappedParameters, ModelError, ModelResult, ParamValue, RemoteJobId};

/// Field name that must be present in every submission.
const JOB_NAME_FIELD: &str = "name";
/// Field set by the agent itself, never taken from parameters.
const USER_ENV_FIELD: &str = "get_user_environment";

/// `job` object of a submit request: every mapped parameter plus the fixed
/// user-environment switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobProperties {
    get_user_environment: u8,
    #[serde(flatten)]
    params: MappedParameters,
}

impl JobProperties {
    /// Validates that a job name is present and strips agent-owned fields.
    pub fn new(mut params: MappedParameters) -> ModelResult<Self> {
        match params.get(JOB_NAME_FIELD) {
            Some(ParamValue::Text(name)) if !name.trim().is_empty() => {}
            _ => return Err(ModelError::MissingField(JOB_NAME_FIELD)),
        }
        params.remove(USER_ENV_FIELD);
        Ok(Self {
            get_user_environment: 1,
            params,
        })
    }

    pub fn params(&self) -> &MappedParameters {
        &self.params
    }
}

/// Submit request body: raw script text plus job properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSubmission {
    pub script: String,
    pub job: JobProperties,
}

/// Either a single item or a list of items.
///
/// The resource manager is not consistent about error payload shape.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(t) => vec![t],
            OneOrMany::Many(v) => v,
        }
    }
}

/// Error entry reported by the resource manager.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteError {
    #[serde(default, alias = "message")]
    pub error: Option<String>,
    #[serde(default, alias = "code")]
    pub errno: Option<i64>,
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = self.error.as_deref().unwrap_or("unknown error");
        match self.errno {
            Some(code) => write!(f, "{msg} (errno {code})"),
            None => f.write_str(msg),
        }
    }
}

/// Response of the submit endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubmitResponse {
    #[serde(default)]
    pub job_id: Option<RemoteJobId>,
    #[serde(default)]
    pub errors: OneOrMany<RemoteError>,
}

/// One job entry of the job-query endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteJob {
    #[serde(default)]
    pub job_id: Option<RemoteJobId>,
    pub job_state: String,
}

/// Response of the job-query endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JobsResponse {
    #[serde(default)]
    pub jobs: Vec<RemoteJob>,
    #[serde(default)]
    pub errors: OneOrMany<RemoteError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_properties_require_name() {
        let mut params = MappedParameters::new();
        params.insert("partition", "debug");
        assert!(matches!(
            JobProperties::new(params),
            Err(ModelError::MissingField("name"))
        ));
    }

    #[test]
    fn job_properties_flatten_params() {
        let mut params = MappedParameters::new();
        params
            .insert("name", "job")
            .insert("tasks", "4")
            .insert("get_user_environment", "0");

        let body = JobSubmission {
            script: "#!/bin/bash\n".into(),
            job: JobProperties::new(params).unwrap(),
        };
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "script": "#!/bin/bash\n",
                "job": {"name": "job", "tasks": "4", "get_user_environment": 1}
            })
        );
    }

    #[test]
    fn submit_response_accepts_single_error_object() {
        let single: SubmitResponse =
            serde_json::from_str(r#"{"errors": {"error": "denied", "errno": 2}}"#).unwrap();
        let errors = single.errors.into_vec();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "denied (errno 2)");

        let list: SubmitResponse =
            serde_json::from_str(r#"{"job_id": 99, "errors": []}"#).unwrap();
        assert_eq!(list.job_id, Some(RemoteJobId(99)));
        assert!(list.errors.into_vec().is_empty());
    }

    #[test]
    fn jobs_response_defaults() {
        let resp: JobsResponse =
            serde_json::from_str(r#"{"jobs": [{"job_state": "RUNNING"}]}"#).unwrap();
        assert_eq!(resp.jobs.len(), 1);
        assert_eq!(resp.jobs[0].job_state, "RUNNING");
    }
}
