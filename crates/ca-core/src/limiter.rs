use std::{future::Future, sync::Arc};

use tokio::sync::Semaphore;

/// Bounds the number of outbound calls in flight across all tasks sharing it.
#[derive(Debug, Clone)]
pub struct RequestLimiter {
    permits: Arc<Semaphore>,
    max: usize,
}

impl RequestLimiter {
    /// `max_in_flight` is clamped to at least one.
    pub fn new(max_in_flight: usize) -> Self {
        let max = max_in_flight.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max)),
            max,
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max
    }

    /// Awaits `fut` while holding one permit.
    pub async fn run<F>(&self, fut: F) -> F::Output
    where
        F: Future,
    {
        // The semaphore is never closed, so acquire only fails if that changes.
        let _permit = self.permits.acquire().await.ok();
        fut.await
    }
}
