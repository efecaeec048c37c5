use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::job::{Job, JobResult};
use crate::analyzer::DocumentAnalyzer;
use crate::config::StorageFailurePolicy;
use crate::error::JobError;
use crate::models::JobOutput;
use crate::prompts::TURKISH_INVOICE_EXTRACTION;
use crate::storage::ObjectStore;

/// Collaborators shared by every worker in the pool.
pub(crate) struct WorkerContext {
    pub analyzer: Arc<dyn DocumentAnalyzer>,
    pub store: Arc<dyn ObjectStore>,
    pub on_storage_failure: StorageFailurePolicy,
}

/// One worker: pulls jobs off the shared queue until the queue closes or
/// the pool is cancelled.
///
/// Every job taken gets exactly one reply. Failures are reported through
/// the job's channel, never by tearing the worker down; a worker only
/// exits when there is no more work to take.
pub(crate) async fn run(
    worker_id: usize,
    queue: Arc<Mutex<mpsc::Receiver<Job>>>,
    ctx: Arc<WorkerContext>,
    cancel: CancellationToken,
) {
    debug!(worker_id, "worker starting");
    let mut processed = 0u64;

    loop {
        // Holding the lock across recv keeps takes fair: one waiting
        // worker wakes per job pushed.
        let job = {
            let mut rx = queue.lock().await;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(worker_id, processed, "worker cancelled while idle");
                    break;
                }
                job = rx.recv() => match job {
                    Some(job) => job,
                    None => {
                        debug!(worker_id, processed, "queue closed, worker draining out");
                        break;
                    }
                }
            }
        };

        info!(worker_id, job_id = %job.id, "processing job");

        // A cancellation mid-pipeline still answers the caller; the job's
        // terminal state is Cancelled, not silence.
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(JobError::Cancelled),
            result = process(&ctx, &job) => result,
        };

        match &result {
            Ok(output) => info!(
                worker_id,
                job_id = %job.id,
                invoice_number = %output.invoice.invoice_number,
                "job finished"
            ),
            Err(e) => warn!(worker_id, job_id = %job.id, error = %e, "job failed"),
        }

        processed += 1;
        job.complete(result);
    }

    debug!(worker_id, processed, "worker stopped");
}

/// The two-step pipeline: analyze, then archive. Strictly sequential, no
/// retries. An empty payload short-circuits before either collaborator is
/// touched.
async fn process(ctx: &WorkerContext, job: &Job) -> JobResult {
    if job.payload.is_empty() {
        return Err(JobError::MissingPayload);
    }

    let mut invoice = ctx
        .analyzer
        .analyze(&job.payload, TURKISH_INVOICE_EXTRACTION)
        .await?;
    invoice.created_at = Utc::now().to_rfc3339();

    if let Err(e) = ctx
        .store
        .put(&job.storage_key, &job.payload.data, &job.payload.content_type)
        .await
    {
        return match ctx.on_storage_failure {
            // A lost archive invalidates the whole job, extraction included
            StorageFailurePolicy::Fail => Err(JobError::Archive(e)),
            StorageFailurePolicy::Warn => {
                warn!(job_id = %job.id, error = %e, "archive failed, returning extraction anyway");
                Ok(JobOutput {
                    invoice,
                    archive_warning: Some(e.to_string()),
                })
            }
        };
    }

    Ok(JobOutput {
        invoice,
        archive_warning: None,
    })
}
