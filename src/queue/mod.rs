//! Bounded job queue and the worker pool that drains it.
//!
//! The queue is a bounded mpsc channel: the dispatcher owns the sending
//! half, the workers share the receiving half. Capacity and worker count
//! are fixed at startup and never resized.

mod dispatcher;
mod job;
mod worker;

pub use dispatcher::Dispatcher;
pub use job::{Job, JobResult};

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::analyzer::DocumentAnalyzer;
use crate::config::QueueConfig;
use crate::storage::ObjectStore;
use worker::WorkerContext;

/// Fixed-size pool of workers behind a bounded queue.
///
/// Spawned once at startup; the returned [`Dispatcher`] is the only way
/// in. Dropping every dispatcher clone closes the queue, after which the
/// workers finish whatever is already buffered and exit.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    cancel: CancellationToken,
}

impl WorkerPool {
    pub fn start(
        config: &QueueConfig,
        analyzer: Arc<dyn DocumentAnalyzer>,
        store: Arc<dyn ObjectStore>,
    ) -> (Self, Dispatcher) {
        let (tx, rx) = mpsc::channel(config.capacity);
        let rx = Arc::new(Mutex::new(rx));
        let cancel = CancellationToken::new();
        let ctx = Arc::new(WorkerContext {
            analyzer,
            store,
            on_storage_failure: config.storage_failure_policy,
        });

        let handles = (1..=config.workers)
            .map(|worker_id| {
                tokio::spawn(worker::run(
                    worker_id,
                    Arc::clone(&rx),
                    Arc::clone(&ctx),
                    cancel.clone(),
                ))
            })
            .collect();

        info!(
            workers = config.workers,
            capacity = config.capacity,
            "worker pool started"
        );

        (
            Self { handles, cancel },
            Dispatcher::new(tx, config.job_timeout),
        )
    }

    /// Stops idle workers and interrupts in-flight jobs. Interrupted jobs
    /// still answer their callers, tagged cancelled; jobs left in the
    /// queue are dropped and surface to their callers as a closed queue.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Waits for every worker to exit. Returns once the queue has drained
    /// (all dispatchers dropped) or after [`shutdown`](Self::shutdown).
    pub async fn join(self) {
        for handle in self.handles {
            let _ = handle.await;
        }
    }

    /// Drains like [`join`](Self::join), but cancels whatever is still
    /// running once the deadline passes, then waits for the workers to
    /// acknowledge.
    pub async fn join_with_deadline(mut self, deadline: Duration) {
        let drain = futures::future::join_all(std::mem::take(&mut self.handles));
        tokio::pin!(drain);

        if tokio::time::timeout(deadline, &mut drain).await.is_err() {
            warn!(?deadline, "drain deadline passed, cancelling in-flight jobs");
            self.cancel.cancel();
            drain.await;
        }
    }
}
