//! Supervisor event logging.
//!
//! The agent cycles run as supervised periodic tasks; this subscriber turns
//! the supervisor's lifecycle events into `tracing` records.

use async_trait::async_trait;
use taskvisor::{Event, EventKind, Subscribe};
use tracing::{debug, error, info, trace, warn};

/// Bounded queue size; events beyond it are dropped by the supervisor.
const QUEUE_CAPACITY: usize = 1024;

/// Logs supervisor events with the task name as a structured field.
#[derive(Debug, Default, Clone, Copy)]
pub struct EventLogger;

#[async_trait]
impl Subscribe for EventLogger {
    async fn on_event(&self, event: &Event) {
        log_event(event);
    }

    fn name(&self) -> &'static str {
        "event-logger"
    }

    fn queue_capacity(&self) -> usize {
        QUEUE_CAPACITY
    }
}

fn log_event(e: &Event) {
    let task = e.task.as_deref().unwrap_or("-");
    let reason = e.reason.as_deref().unwrap_or("");
    let attempt = e.attempt.unwrap_or(0);

    match e.kind {
        EventKind::TaskStarting => debug!(task, attempt, "cycle starting"),
        EventKind::TaskStopped => trace!(task, "cycle finished"),
        EventKind::TaskFailed => warn!(task, attempt, reason, "cycle failed"),
        EventKind::TimeoutHit => warn!(
            task,
            timeout_ms = e.timeout_ms.unwrap_or(0),
            "cycle exceeded its timeout"
        ),
        EventKind::BackoffScheduled => trace!(
            task,
            delay_ms = e.delay_ms.unwrap_or(0),
            "next cycle scheduled"
        ),
        EventKind::ActorExhausted => info!(task, reason, "task will not run again"),
        EventKind::ActorDead => error!(task, reason, "task stopped permanently"),
        EventKind::ShutdownRequested => info!("shutdown requested"),
        EventKind::AllStoppedWithinGrace => info!("all tasks stopped"),
        EventKind::GraceExceeded => warn!("some tasks did not stop within the grace period"),
        EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => {
            error!(task, reason, "event subscriber failure")
        }
        #[allow(unreachable_patterns)]
        _ => trace!(task, kind = ?e.kind, "supervisor event"),
    }
}
