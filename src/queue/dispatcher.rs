use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::job::{Job, JobResult};
use crate::error::JobError;
use crate::models::UploadPayload;

/// Submitting handle for the job queue. Cheap to clone; every in-flight
/// request task holds one.
///
/// `dispatch` is where backpressure lives: once the queue holds its full
/// capacity of waiting jobs, the send suspends the caller until a worker
/// frees a slot. Nothing is ever dropped or rejected for being "too busy".
#[derive(Clone)]
pub struct Dispatcher {
    queue: mpsc::Sender<Job>,
    job_timeout: Option<Duration>,
}

impl Dispatcher {
    pub(crate) fn new(queue: mpsc::Sender<Job>, job_timeout: Option<Duration>) -> Self {
        Self { queue, job_timeout }
    }

    /// Enqueues one upload and waits for its outcome.
    ///
    /// Exactly one result comes back per call: the worker's reply, or an
    /// error when the pool is gone or the configured wait expires.
    pub async fn dispatch(&self, payload: UploadPayload, storage_key: String) -> JobResult {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job = Job::new(storage_key, payload, reply_tx);
        let job_id = job.id;

        self.queue
            .send(job)
            .await
            .map_err(|_| JobError::QueueClosed)?;
        debug!(%job_id, "job enqueued");

        let outcome = match self.job_timeout {
            Some(limit) => match tokio::time::timeout(limit, reply_rx).await {
                Ok(received) => received,
                Err(_) => {
                    debug!(%job_id, timeout = ?limit, "gave up waiting for job result");
                    return Err(JobError::TimedOut(limit));
                }
            },
            None => reply_rx.await,
        };

        // A dropped reply sender means the job was discarded during
        // shutdown before any worker picked it up.
        outcome.unwrap_or(Err(JobError::QueueClosed))
    }
}
