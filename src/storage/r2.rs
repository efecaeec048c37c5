// Cloudflare R2 client over the S3 API
// R2 exposes an account-scoped endpoint and only speaks path-style
// addressing, hence the custom region below.

use std::time::Duration;

use async_trait::async_trait;
use s3::creds::Credentials;
use s3::{Bucket, Region};
use tracing::debug;

use crate::config::StorageConfig;
use crate::error::StorageError;
use crate::storage::ObjectStore;

const DEFAULT_PRESIGN_EXPIRY_SECS: u32 = 30 * 60;
// S3 caps presigned URLs at seven days
const MAX_PRESIGN_EXPIRY_SECS: u32 = 7 * 24 * 60 * 60;

pub struct R2Store {
    bucket: Bucket,
}

impl R2Store {
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let region = Region::Custom {
            region: "auto".to_string(),
            endpoint: format!("https://{}.r2.cloudflarestorage.com", config.account_id),
        };

        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        let bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|e| StorageError::Backend(e.to_string()))?
            .with_path_style();

        Ok(Self { bucket })
    }
}

#[async_trait]
impl ObjectStore for R2Store {
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), StorageError> {
        let response = self
            .bucket
            .put_object_with_content_type(key, data, content_type)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        if response.status_code() != 200 {
            return Err(StorageError::Rejected {
                code: response.status_code(),
                key: key.to_string(),
            });
        }

        debug!(key, "archived object");
        Ok(())
    }

    async fn presigned_get_url(
        &self,
        key: &str,
        expires: Duration,
    ) -> Result<String, StorageError> {
        let expiry_secs = if expires.is_zero() {
            DEFAULT_PRESIGN_EXPIRY_SECS
        } else {
            expires.as_secs().min(u64::from(MAX_PRESIGN_EXPIRY_SECS)) as u32
        };

        self.bucket
            .presign_get(key, expiry_secs, None)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))
    }
}
