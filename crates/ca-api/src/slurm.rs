use async_trait::async_trait;
use ca_core::{AgentError, AgentResult, ResourceManagerApi, SlurmAuth};
use ca_model::{
    RemoteJobId,
    wire::{JobSubmission, JobsResponse, RemoteError, SubmitResponse},
};
use reqwest::{Client, RequestBuilder, Url};
use tracing::{debug, instrument};

use crate::{
    ApiResult,
    http::{endpoint, parse_base},
};

pub const USER_NAME_HEADER: &str = "X-SLURM-USER-NAME";
pub const USER_TOKEN_HEADER: &str = "X-SLURM-USER-TOKEN";

/// slurmrestd client for one API version (e.g. `v0.0.36`).
pub struct SlurmrestdClient {
    http: Client,
    base: Url,
    version: String,
}

impl SlurmrestdClient {
    pub fn new(http: Client, base_url: &str, version: impl Into<String>) -> ApiResult<Self> {
        Ok(Self {
            http,
            base: parse_base(base_url)?,
            version: version.into(),
        })
    }

    fn url(&self, tail: &str) -> AgentResult<Url> {
        endpoint(&self.base, &format!("slurm/{}/{tail}", self.version))
            .map_err(|e| AgentError::Submission(e.to_string()))
    }

    fn with_identity(req: RequestBuilder, auth: &SlurmAuth) -> RequestBuilder {
        req.header(USER_NAME_HEADER, &auth.user_name)
            .header(USER_TOKEN_HEADER, &auth.token)
    }

    /// Sends `req` and returns the status and raw body.
    async fn exchange(req: RequestBuilder) -> AgentResult<(reqwest::StatusCode, String)> {
        let resp = req
            .send()
            .await
            .map_err(|e| AgentError::Submission(format!("resource manager unreachable: {e}")))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| AgentError::Submission(format!("could not read response: {e}")))?;
        debug!(status = %status, "resource-manager response");
        Ok((status, body))
    }
}

fn join_errors(errors: &[RemoteError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[async_trait]
impl ResourceManagerApi for SlurmrestdClient {
    #[instrument(level = "debug", skip(self, job, auth), fields(user = %auth.user_name))]
    async fn submit(&self, job: &JobSubmission, auth: &SlurmAuth) -> AgentResult<RemoteJobId> {
        let req = self.http.post(self.url("job/submit")?).json(job);
        let (status, body) = Self::exchange(Self::with_identity(req, auth)).await?;

        let parsed = serde_json::from_str::<SubmitResponse>(&body).ok();
        let errors = parsed
            .as_ref()
            .map(|p| p.errors.clone().into_vec())
            .unwrap_or_default();
        if !errors.is_empty() {
            return Err(AgentError::Submission(join_errors(&errors)));
        }
        if !status.is_success() {
            return Err(AgentError::Submission(format!(
                "resource manager returned {status}: {}",
                body.trim()
            )));
        }
        parsed.and_then(|p| p.job_id).ok_or_else(|| {
            AgentError::Submission("resource manager response carried no job_id".into())
        })
    }

    #[instrument(level = "debug", skip(self, auth), fields(user = %auth.user_name))]
    async fn job_state(&self, id: RemoteJobId, auth: &SlurmAuth) -> AgentResult<String> {
        let req = self.http.get(self.url(&format!("job/{id}"))?);
        let (status, body) = Self::exchange(Self::with_identity(req, auth)).await?;
        if !status.is_success() {
            return Err(AgentError::Submission(format!(
                "job {id} query returned {status}: {}",
                body.trim()
            )));
        }

        let parsed: JobsResponse = serde_json::from_str(&body).map_err(|e| {
            AgentError::Submission(format!("malformed job {id} response: {e}"))
        })?;
        let errors = parsed.errors.into_vec();
        if !errors.is_empty() {
            return Err(AgentError::Submission(join_errors(&errors)));
        }
        match <[_; 1]>::try_from(parsed.jobs) {
            Ok([job]) => Ok(job.job_state),
            Err(jobs) => Err(AgentError::Submission(format!(
                "expected exactly one job for {id}, got {}",
                jobs.len()
            ))),
        }
    }
}
