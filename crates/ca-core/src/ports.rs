//! Collaborator interfaces consumed by the pipeline.
//!
//! Adapters live in other crates (`ca-api` for HTTP, `ca-exec` for local
//! commands); tests use in-memory fakes.
use async_trait::async_trait;

use ca_model::{
    ActiveSubmission, JobState, PendingRecord, RemoteJobId, SubmissionId, wire::JobSubmission,
};

use crate::AgentResult;

/// Job-management service.
#[async_trait]
pub trait JobManagementApi: Send + Sync {
    /// Records that cannot be decoded but carry an id come back as
    /// [`PendingRecord::Malformed`]; records without an id are left out.
    async fn fetch_pending(&self) -> AgentResult<Vec<PendingRecord>>;

    async fn fetch_active(&self) -> AgentResult<Vec<ActiveSubmission>>;

    async fn report_submitted(&self, id: SubmissionId, remote_job_id: RemoteJobId)
    -> AgentResult<()>;

    /// An empty `message` is not sent.
    async fn report_status(&self, id: SubmissionId, state: JobState, message: &str)
    -> AgentResult<()>;
}

/// Identity headers attached to every resource-manager request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlurmAuth {
    pub user_name: String,
    pub token: String,
}

/// Resource-manager REST interface.
#[async_trait]
pub trait ResourceManagerApi: Send + Sync {
    async fn submit(&self, job: &JobSubmission, auth: &SlurmAuth) -> AgentResult<RemoteJobId>;

    /// Remote state string of a job (e.g. `RUNNING`).
    async fn job_state(&self, id: RemoteJobId, auth: &SlurmAuth) -> AgentResult<String>;
}

/// Issues a fresh credential for an identity.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn issue(&self, identity: &str) -> AgentResult<String>;
}

/// Resolves the cluster username of a submitting user.
#[async_trait]
pub trait UserMapper: Send + Sync {
    fn name(&self) -> &'static str;

    /// Validates settings and prepares connections; called once at startup.
    async fn configure(&mut self) -> AgentResult<()> {
        Ok(())
    }

    async fn resolve_username(&self, email: &str) -> AgentResult<String>;
}
