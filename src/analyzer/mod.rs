// Document analysis abstraction layer

use async_trait::async_trait;

use crate::error::AnalyzerError;
use crate::models::{InvoiceRecord, UploadPayload};

pub mod gemini;

pub use gemini::GeminiAnalyzer;

/// Turns an uploaded document into structured invoice data.
///
/// Implementations are shared across the worker pool, so they must be safe
/// to call concurrently. One call per job; the pipeline never retries.
#[async_trait]
pub trait DocumentAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        payload: &UploadPayload,
        instructions: &str,
    ) -> Result<InvoiceRecord, AnalyzerError>;
}
