use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::JobError;
use crate::models::{JobOutput, UploadPayload};

/// Outcome a worker reports for one job. Success and failure are mutually
/// exclusive; every job gets exactly one of them.
pub type JobResult = Result<JobOutput, JobError>;

/// A single unit of work travelling from the dispatcher to a worker.
///
/// The reply sender is single-use: sending consumes it, so a job can carry
/// at most one outcome back to the caller that submitted it.
pub struct Job {
    pub id: Uuid,
    /// Archive location for the original document.
    pub storage_key: String,
    pub payload: UploadPayload,
    pub(crate) reply: oneshot::Sender<JobResult>,
}

impl Job {
    pub(crate) fn new(
        storage_key: String,
        payload: UploadPayload,
        reply: oneshot::Sender<JobResult>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            storage_key,
            payload,
            reply,
        }
    }

    /// Consumes the job and delivers its outcome. A caller that stopped
    /// waiting has dropped its receiver; the late result is discarded
    /// rather than treated as an error.
    pub(crate) fn complete(self, result: JobResult) {
        let _ = self.reply.send(result);
    }
}
