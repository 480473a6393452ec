//! Tracking of submitted jobs until they finish.
use std::sync::Arc;

use ca_model::{ActiveSubmission, JobState};
use futures::future::join_all;
use tracing::{Instrument, debug, error, info, info_span, instrument, warn};
use uuid::Uuid;

use crate::{
    AgentResult, CredentialCache, JobManagementApi, RequestLimiter, ResourceManagerApi, SlurmAuth,
};

/// Counts of one status cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatusSummary {
    /// Terminal state reported.
    pub finished: usize,
    pub still_running: usize,
    /// Remote query failed; retried next cycle.
    pub skipped: usize,
    pub report_failures: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tracked {
    Finished,
    Running,
    Skipped,
    Undelivered,
}

/// Polls the resource manager for every active submission.
///
/// All queries run as one configured cluster identity.
pub struct StatusTracker {
    jobs: Arc<dyn JobManagementApi>,
    slurm: Arc<dyn ResourceManagerApi>,
    credentials: Arc<CredentialCache>,
    limiter: RequestLimiter,
    user_name: String,
}

impl StatusTracker {
    pub fn new(
        jobs: Arc<dyn JobManagementApi>,
        slurm: Arc<dyn ResourceManagerApi>,
        credentials: Arc<CredentialCache>,
        limiter: RequestLimiter,
        user_name: impl Into<String>,
    ) -> Self {
        Self {
            jobs,
            slurm,
            credentials,
            limiter,
            user_name: user_name.into(),
        }
    }

    /// Reports every active submission whose remote job reached a terminal state.
    ///
    /// Failing to fetch the active list or to obtain a token fails the cycle.
    #[instrument(level = "info", skip(self), fields(cycle = %Uuid::new_v4()))]
    pub async fn finish_active_jobs(&self) -> AgentResult<StatusSummary> {
        let active = self.limiter.run(self.jobs.fetch_active()).await?;
        debug!(count = active.len(), "fetched active submissions");
        if active.is_empty() {
            return Ok(StatusSummary::default());
        }

        let token = self
            .limiter
            .run(self.credentials.acquire(&self.user_name))
            .await?;
        let auth = SlurmAuth {
            user_name: self.user_name.clone(),
            token,
        };

        let results = join_all(active.iter().map(|sub| {
            let span = info_span!("submission", id = %sub.id, remote_job_id = %sub.remote_job_id);
            self.track(sub, &auth).instrument(span)
        }))
        .await;

        let mut summary = StatusSummary::default();
        for tracked in results {
            match tracked {
                Tracked::Finished => summary.finished += 1,
                Tracked::Running => summary.still_running += 1,
                Tracked::Skipped => summary.skipped += 1,
                Tracked::Undelivered => summary.report_failures += 1,
            }
        }
        info!(
            finished = summary.finished,
            still_running = summary.still_running,
            skipped = summary.skipped,
            report_failures = summary.report_failures,
            "status cycle finished"
        );
        Ok(summary)
    }

    async fn track(&self, sub: &ActiveSubmission, auth: &SlurmAuth) -> Tracked {
        let remote = match self
            .limiter
            .run(self.slurm.job_state(sub.remote_job_id, auth))
            .await
        {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "could not query job state; skipping");
                return Tracked::Skipped;
            }
        };

        let state = JobState::from_remote(&remote);
        if !state.is_terminal() {
            debug!(remote_state = %remote, "job still running");
            return Tracked::Running;
        }

        match self
            .limiter
            .run(self.jobs.report_status(sub.id, state, ""))
            .await
        {
            Ok(()) => {
                info!(state = %state, remote_state = %remote, "job finished");
                Tracked::Finished
            }
            Err(e) => {
                error!(state = %state, error = %e, "could not report job state");
                Tracked::Undelivered
            }
        }
    }
}
