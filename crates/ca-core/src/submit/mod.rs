//! Dispatch of pending submissions to the resource manager.
//!
//! Every submission goes through the same strictly ordered steps:
//!
//! ```text
//! resolve username → extract script → map directives → build request
//!   → (stage files) → acquire token → submit → report
//! ```
//!
//! A failure before `submit` completes turns into a `REJECTED` report carrying
//! the error message. Submissions run concurrently and never affect each other;
//! outbound calls share one [`RequestLimiter`].
mod staging;
pub use staging::{resolve_below, stage_files};

use std::{path::PathBuf, sync::Arc};

use ca_directives::Directives;
use ca_model::{
    JobState, MappedParameters, PendingRecord, PendingSubmission, RemoteJobId, SubmissionId,
    SubmissionOutcome,
    wire::{JobProperties, JobSubmission},
};
use futures::future::join_all;
use tracing::{Instrument, debug, error, info, info_span, instrument, warn};
use uuid::Uuid;

use crate::{
    AgentError, AgentResult, CredentialCache, JobManagementApi, RequestLimiter,
    ResourceManagerApi, SlurmAuth, UserMapper,
};

/// Message of a submission whose main script is missing or blank.
pub const NO_SCRIPT_MESSAGE: &str = "Could not find an executable script in retrieved job script data.";

#[derive(Debug, Clone)]
pub struct SubmitConfig {
    /// Parent of the per-submission directories (`<default_work_dir>/<id>`)
    /// used when a submission has no execution directory.
    pub default_work_dir: PathBuf,
    /// Write all script files into the submit directory before submitting.
    pub stage_files: bool,
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            default_work_dir: PathBuf::from("/tmp"),
            stage_files: true,
        }
    }
}

/// Counts of one submit cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub submitted: usize,
    pub rejected: usize,
    /// Accepted remotely but the `SUBMITTED` report failed.
    pub aborted: usize,
    /// Reports that could not be delivered at all.
    pub report_failures: usize,
}

/// What happened to one submission after reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reported {
    Submitted,
    Rejected,
    Aborted,
    Undelivered,
}

pub struct SubmissionCoordinator {
    jobs: Arc<dyn JobManagementApi>,
    slurm: Arc<dyn ResourceManagerApi>,
    credentials: Arc<CredentialCache>,
    users: Arc<dyn UserMapper>,
    directives: Arc<Directives>,
    limiter: RequestLimiter,
    cfg: SubmitConfig,
}

impl SubmissionCoordinator {
    pub fn new(
        jobs: Arc<dyn JobManagementApi>,
        slurm: Arc<dyn ResourceManagerApi>,
        credentials: Arc<CredentialCache>,
        users: Arc<dyn UserMapper>,
        directives: Arc<Directives>,
        limiter: RequestLimiter,
        cfg: SubmitConfig,
    ) -> Self {
        Self {
            jobs,
            slurm,
            credentials,
            users,
            directives,
            limiter,
            cfg,
        }
    }

    /// Fetches pending submissions and dispatches each of them.
    ///
    /// Only a failure to fetch the batch is returned; per-submission failures
    /// are reported to the job-management service and counted.
    #[instrument(level = "info", skip(self), fields(cycle = %Uuid::new_v4()))]
    pub async fn submit_pending_jobs(&self) -> AgentResult<BatchSummary> {
        let pending = self.limiter.run(self.jobs.fetch_pending()).await?;
        debug!(count = pending.len(), "fetched pending submissions");

        let results = join_all(pending.iter().map(|record| {
            let span = info_span!("submission", id = %record.id());
            self.process(record).instrument(span)
        }))
        .await;

        let mut summary = BatchSummary::default();
        for reported in results {
            match reported {
                Reported::Submitted => summary.submitted += 1,
                Reported::Rejected => summary.rejected += 1,
                Reported::Aborted => summary.aborted += 1,
                Reported::Undelivered => summary.report_failures += 1,
            }
        }
        info!(
            submitted = summary.submitted,
            rejected = summary.rejected,
            aborted = summary.aborted,
            report_failures = summary.report_failures,
            "submit cycle finished"
        );
        Ok(summary)
    }

    async fn process(&self, record: &PendingRecord) -> Reported {
        let dispatched = match record {
            PendingRecord::Valid(sub) => self.dispatch(sub).await,
            PendingRecord::Malformed { reason, .. } => {
                Err(AgentError::MalformedRecord(reason.clone()))
            }
        };
        let outcome = match dispatched {
            Ok(remote) => SubmissionOutcome::Submitted(remote),
            Err(e) => {
                warn!(error = %e, "submission rejected");
                SubmissionOutcome::Rejected(e.to_string())
            }
        };
        self.report(record.id(), outcome).await
    }

    /// Runs every step up to and including the remote submit.
    async fn dispatch(&self, sub: &PendingSubmission) -> AgentResult<RemoteJobId> {
        let username = self
            .limiter
            .run(self.users.resolve_username(&sub.owner_email))
            .await?;
        debug!(username = %username, "username resolved");

        let script = sub
            .script_files
            .main_script()
            .ok_or_else(|| AgentError::Script(NO_SCRIPT_MESSAGE.to_string()))?;

        let submit_dir = self.submit_dir(sub);
        let defaults = self.defaults(sub, &submit_dir);
        let params = self.directives.job_parameters(script, &defaults)?;
        let job = JobProperties::new(params).map_err(|e| AgentError::Mapping(e.to_string()))?;
        let request = JobSubmission {
            script: script.to_string(),
            job,
        };
        debug!(parameters = request.job.params().len(), "request built");

        if self.cfg.stage_files {
            stage_files(&submit_dir, &sub.script_files.files).await?;
        }

        let token = self
            .limiter
            .run(self.credentials.acquire(&username))
            .await?;
        let auth = SlurmAuth {
            user_name: username,
            token,
        };
        let remote = self.limiter.run(self.slurm.submit(&request, &auth)).await?;
        info!(remote_job_id = %remote, "job submitted");
        Ok(remote)
    }

    /// Sends the report for `outcome`; failures are logged, never returned.
    async fn report(&self, id: SubmissionId, outcome: SubmissionOutcome) -> Reported {
        match outcome {
            SubmissionOutcome::Submitted(remote) => {
                let res = self
                    .limiter
                    .run(self.jobs.report_submitted(id, remote))
                    .await;
                let Err(e) = res else {
                    return Reported::Submitted;
                };
                error!(remote_job_id = %remote, error = %e, "could not report submitted job");

                let message =
                    format!("job {remote} was submitted but its record could not be updated: {e}");
                match self
                    .limiter
                    .run(self.jobs.report_status(id, JobState::Aborted, &message))
                    .await
                {
                    Ok(()) => Reported::Aborted,
                    Err(e) => {
                        error!(error = %e, "could not report aborted submission");
                        Reported::Undelivered
                    }
                }
            }
            SubmissionOutcome::Rejected(reason) => {
                match self
                    .limiter
                    .run(self.jobs.report_status(id, JobState::Rejected, &reason))
                    .await
                {
                    Ok(()) => Reported::Rejected,
                    Err(e) => {
                        error!(error = %e, "could not report rejected submission");
                        Reported::Undelivered
                    }
                }
            }
        }
    }

    fn submit_dir(&self, sub: &PendingSubmission) -> PathBuf {
        match &sub.execution_directory {
            Some(dir) => dir.clone(),
            None => self.cfg.default_work_dir.join(sub.id.to_string()),
        }
    }

    /// Agent defaults overridden by the caller-supplied execution parameters.
    fn defaults(&self, sub: &PendingSubmission, submit_dir: &std::path::Path) -> MappedParameters {
        let dir = submit_dir.display();
        let mut defaults = MappedParameters::new();
        defaults
            .insert("name", sub.name.clone())
            .insert("current_working_directory", dir.to_string())
            .insert("standard_output", format!("{dir}/{}.out", sub.name))
            .insert("standard_error", format!("{dir}/{}.err", sub.name));
        defaults.merged(&sub.execution_parameters)
    }
}
