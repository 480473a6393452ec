//! The two periodic agent cycles as supervised tasks.
//!
//! Each cycle restarts after every run: after `every` on success, and after the
//! same delay (with jitter) on failure. A run that exceeds the timeout is
//! cancelled by the supervisor.
use std::{future::Future, sync::Arc, time::Duration};

use ca_core::{AgentResult, StatusTracker, SubmissionCoordinator};
use taskvisor::{
    BackoffPolicy, ControllerSpec, JitterPolicy, RestartPolicy, TaskError, TaskFn, TaskRef,
    TaskSpec,
};
use tokio_util::sync::CancellationToken;

pub const SUBMIT_TASK: &str = "submit-pending-jobs";
pub const STATUS_TASK: &str = "finish-active-jobs";

pub fn submit_cycle(
    coordinator: Arc<SubmissionCoordinator>,
    every: Duration,
    timeout: Duration,
) -> ControllerSpec {
    let task: TaskRef = TaskFn::arc(SUBMIT_TASK, move |ctx: CancellationToken| {
        let coordinator = Arc::clone(&coordinator);
        async move { run_cycle(ctx, coordinator.submit_pending_jobs()).await }
    });
    periodic(task, every, timeout)
}

pub fn status_cycle(
    tracker: Arc<StatusTracker>,
    every: Duration,
    timeout: Duration,
) -> ControllerSpec {
    let task: TaskRef = TaskFn::arc(STATUS_TASK, move |ctx: CancellationToken| {
        let tracker = Arc::clone(&tracker);
        async move { run_cycle(ctx, tracker.finish_active_jobs()).await }
    });
    periodic(task, every, timeout)
}

/// Runs one cycle; a cycle error fails this run only.
async fn run_cycle<T, F>(ctx: CancellationToken, cycle: F) -> Result<(), TaskError>
where
    F: Future<Output = AgentResult<T>>,
{
    if ctx.is_cancelled() {
        return Err(TaskError::Canceled);
    }
    tokio::select! {
        res = cycle => res.map(|_| ()).map_err(|e| TaskError::Fail { reason: e.to_string() }),
        _ = ctx.cancelled() => Err(TaskError::Canceled),
    }
}

fn periodic(task: TaskRef, every: Duration, timeout: Duration) -> ControllerSpec {
    let backoff = BackoffPolicy {
        success_delay: Some(every),
        jitter: JitterPolicy::Equal,
        factor: 1.0,
        first: every,
        max: every,
    };
    ControllerSpec::replace(TaskSpec::new(
        task,
        RestartPolicy::Always,
        backoff,
        Some(timeout),
    ))
}

#[cfg(test)]
mod tests {
    use ca_core::AgentError;

    use super::*;

    #[tokio::test]
    async fn cycle_error_fails_the_run() {
        let res = run_cycle(CancellationToken::new(), async {
            Err::<(), _>(AgentError::Fetch("down".into()))
        })
        .await;
        match res {
            Err(TaskError::Fail { reason }) => assert!(reason.contains("down")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancelled_token_skips_the_cycle() {
        let ctx = CancellationToken::new();
        ctx.cancel();
        let res = run_cycle(ctx, async { Ok::<_, AgentError>(()) }).await;
        assert!(matches!(res, Err(TaskError::Canceled)));
    }

    #[tokio::test]
    async fn successful_cycle_completes() {
        let res = run_cycle(CancellationToken::new(), async { Ok::<_, AgentError>(3) }).await;
        assert!(res.is_ok());
    }
}
