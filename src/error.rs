// Error types for the job pipeline and its external collaborators

use std::time::Duration;

use thiserror::Error;

/// Failures from the document analysis backend.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("analysis request failed: {0}")]
    Transport(String),

    #[error("analysis API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("analysis returned no content")]
    EmptyResponse,

    #[error("analysis output is not a valid invoice document: {0}")]
    MalformedOutput(String),
}

/// Failures from the archive storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("storage rejected object '{key}' with status {code}")]
    Rejected { code: u16, key: String },
}

/// Terminal outcome of a failed job. None of these are retried; a worker
/// reports the error through the job's reply channel and moves on.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("job payload is empty")]
    MissingPayload,

    #[error(transparent)]
    Analysis(#[from] AnalyzerError),

    #[error("archive failed: {0}")]
    Archive(#[from] StorageError),

    #[error("job queue is closed")]
    QueueClosed,

    #[error("job timed out after {0:?}")]
    TimedOut(Duration),

    #[error("job was cancelled during shutdown")]
    Cancelled,
}
