//! Fixed pool of workers draining the event queue.
//!
//! Each event is distributed in its own task. The worker waits for that task
//! at most the distribution timeout; on expiry it cancels the event's token
//! and moves on without aborting the task.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::distributor::Distributor;
use crate::queue::EventQueue;
use crate::stats::Stats;

pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `count` workers (at least one) on the current runtime.
    pub fn spawn(
        count: usize,
        queue: Arc<EventQueue>,
        distributor: Arc<Distributor>,
        timeout: Duration,
        stats: Arc<Stats>,
    ) -> Self {
        let handles = (0..count.max(1))
            .map(|id| {
                tokio::spawn(run_worker(
                    id,
                    queue.clone(),
                    distributor.clone(),
                    timeout,
                    stats.clone(),
                ))
            })
            .collect();
        Self { handles }
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Wait for every worker to exit. Workers exit once the queue is closed
    /// and drained.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("worker terminated abnormally: {e}");
            }
        }
    }
}

async fn run_worker(
    id: usize,
    queue: Arc<EventQueue>,
    distributor: Arc<Distributor>,
    timeout: Duration,
    stats: Arc<Stats>,
) {
    debug!(worker = id, "worker started");

    while let Some(event) = queue.dequeue().await {
        let event = Arc::new(event);
        let cancel = CancellationToken::new();

        let task = {
            let distributor = distributor.clone();
            let event = event.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { distributor.distribute(&event, &cancel).await })
        };

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(Ok(()))) => {
                stats.record_distributed();
                debug!(
                    worker = id,
                    event_type = %event.event_type,
                    delivery_id = %event.delivery_id,
                    "event distributed"
                );
            }
            Ok(Ok(Err(failure))) => {
                stats.record_failed();
                warn!(
                    worker = id,
                    provider = %event.provider,
                    event_type = %event.event_type,
                    delivery_id = %event.delivery_id,
                    failed = ?failure.failed_subscribers(),
                    "{failure}"
                );
            }
            Ok(Err(join_error)) => {
                stats.record_failed();
                error!(
                    worker = id,
                    event_type = %event.event_type,
                    delivery_id = %event.delivery_id,
                    "distribution task panicked: {join_error}"
                );
            }
            Err(_) => {
                cancel.cancel();
                stats.record_timed_out();
                warn!(
                    worker = id,
                    event_type = %event.event_type,
                    delivery_id = %event.delivery_id,
                    timeout_secs = timeout.as_secs_f64(),
                    "distribution timed out"
                );
            }
        }
    }

    info!(worker = id, "worker stopped");
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
