// Storage layer (S3-compatible)

use std::time::Duration;

use async_trait::async_trait;

use crate::error::StorageError;

pub mod r2;

pub use r2::R2Store;

/// Durable archive for uploaded originals.
///
/// Shared across the worker pool; implementations must tolerate concurrent
/// puts under distinct keys. Writing an existing key overwrites it.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), StorageError>;

    /// Short-lived public download link for an archived object. A zero
    /// `expires` falls back to the implementation default.
    async fn presigned_get_url(&self, key: &str, expires: Duration)
        -> Result<String, StorageError>;
}
