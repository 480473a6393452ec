//! In-memory port implementations shared by the pipeline tests.
use std::{
    collections::{HashMap, HashSet},
    sync::{
        Mutex,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use ca_model::{
    ActiveSubmission, JobScriptFiles, JobState, PendingRecord, PendingSubmission, RemoteJobId,
    SubmissionId,
    wire::JobSubmission,
};

use crate::{
    AgentError, AgentResult, JobManagementApi, ResourceManagerApi, SlurmAuth, TokenIssuer,
};

pub struct CountingIssuer {
    token: Option<String>,
    delay: Duration,
    count: AtomicUsize,
}

impl CountingIssuer {
    pub fn returning(token: String) -> Self {
        Self {
            token: Some(token),
            delay: Duration::ZERO,
            count: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            token: None,
            delay: Duration::ZERO,
            count: AtomicUsize::new(0),
        }
    }

    pub fn with_delay_ms(mut self, ms: u64) -> Self {
        self.delay = Duration::from_millis(ms);
        self
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenIssuer for CountingIssuer {
    async fn issue(&self, _identity: &str) -> AgentResult<String> {
        self.count.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.token
            .clone()
            .ok_or_else(|| AgentError::Authentication("issuer unavailable".into()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    Submitted(SubmissionId, RemoteJobId),
    Status(SubmissionId, JobState, String),
}

#[derive(Default)]
pub struct RecordingJobs {
    pub pending: Vec<PendingSubmission>,
    /// Ids and decode errors of records that failed to decode.
    pub malformed: Vec<(SubmissionId, String)>,
    pub active: Vec<ActiveSubmission>,
    pub fail_fetch: bool,
    pub fail_reports_for: HashSet<SubmissionId>,
    pub(crate) reports: Mutex<Vec<Report>>,
}

impl RecordingJobs {
    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().unwrap().clone()
    }

    pub fn reports_for(&self, id: SubmissionId) -> Vec<Report> {
        self.reports()
            .into_iter()
            .filter(|r| match r {
                Report::Submitted(i, _) | Report::Status(i, _, _) => *i == id,
            })
            .collect()
    }

    fn record(&self, id: SubmissionId, report: Report) -> AgentResult<()> {
        self.reports.lock().unwrap().push(report);
        if self.fail_reports_for.contains(&id) {
            return Err(AgentError::ApiUpdate(format!("update of {id} refused")));
        }
        Ok(())
    }
}

#[async_trait]
impl JobManagementApi for RecordingJobs {
    async fn fetch_pending(&self) -> AgentResult<Vec<PendingRecord>> {
        if self.fail_fetch {
            return Err(AgentError::Fetch("service unavailable".into()));
        }
        let valid = self.pending.iter().cloned().map(PendingRecord::from);
        let malformed = self
            .malformed
            .iter()
            .map(|(id, reason)| PendingRecord::Malformed {
                id: *id,
                reason: reason.clone(),
            });
        Ok(valid.chain(malformed).collect())
    }

    async fn fetch_active(&self) -> AgentResult<Vec<ActiveSubmission>> {
        if self.fail_fetch {
            return Err(AgentError::Fetch("service unavailable".into()));
        }
        Ok(self.active.clone())
    }

    async fn report_submitted(&self, id: SubmissionId, remote: RemoteJobId) -> AgentResult<()> {
        self.record(id, Report::Submitted(id, remote))
    }

    async fn report_status(
        &self,
        id: SubmissionId,
        state: JobState,
        message: &str,
    ) -> AgentResult<()> {
        self.record(id, Report::Status(id, state, message.to_string()))
    }
}

/// Resource manager that accepts every job unless its name is listed in `reject`.
pub struct FakeSlurm {
    pub(crate) next_id: AtomicU64,
    pub reject: HashSet<String>,
    pub states: HashMap<RemoteJobId, String>,
    pub(crate) submitted: Mutex<Vec<(JobSubmission, SlurmAuth)>>,
}

impl Default for FakeSlurm {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(100),
            reject: HashSet::new(),
            states: HashMap::new(),
            submitted: Mutex::new(Vec::new()),
        }
    }
}

impl FakeSlurm {
    pub fn submitted(&self) -> Vec<(JobSubmission, SlurmAuth)> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResourceManagerApi for FakeSlurm {
    async fn submit(&self, job: &JobSubmission, auth: &SlurmAuth) -> AgentResult<RemoteJobId> {
        let name = job
            .job
            .params()
            .get("name")
            .map(|v| v.to_string())
            .unwrap_or_default();
        if self.reject.contains(&name) {
            return Err(AgentError::Submission(format!("job {name} denied")));
        }
        self.submitted
            .lock()
            .unwrap()
            .push((job.clone(), auth.clone()));
        Ok(RemoteJobId(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    async fn job_state(&self, id: RemoteJobId, _auth: &SlurmAuth) -> AgentResult<String> {
        self.states
            .get(&id)
            .cloned()
            .ok_or_else(|| AgentError::Submission(format!("job {id} not found")))
    }
}

pub fn pending(id: u64, name: &str, script: &str) -> PendingSubmission {
    PendingSubmission {
        id: SubmissionId(id),
        name: name.to_string(),
        owner_email: format!("{name}@example.com"),
        execution_directory: None,
        execution_parameters: Default::default(),
        script_files: JobScriptFiles {
            main_file_path: "main.sh".into(),
            files: [("main.sh".to_string(), script.to_string())].into(),
        },
    }
}
