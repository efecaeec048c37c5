use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub queue: QueueConfig,
    pub analyzer: AnalyzerConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// Number of long-lived workers. Fixed for the lifetime of the pool.
    pub workers: usize,
    /// Jobs the queue buffers before submitters start blocking.
    pub capacity: usize,
    /// How long a caller waits for its result before giving up. `None`
    /// waits indefinitely.
    pub job_timeout: Option<Duration>,
    pub storage_failure_policy: StorageFailurePolicy,
}

/// What to do when analysis succeeded but archival did not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageFailurePolicy {
    /// Fail the whole job; the extraction is discarded.
    Fail,
    /// Keep the extraction and report the archive failure alongside it.
    Warn,
}

impl FromStr for StorageFailurePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "warn" => Ok(Self::Warn),
            other => Err(anyhow::anyhow!("unknown storage failure policy: {other}")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzerConfig {
    pub api_key: String,
    pub model: String,
    /// Override for the API root, mainly for tests against a local mock.
    pub api_base: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub bucket: String,
    pub account_id: String,
    pub access_key: String,
    pub secret_key: String,
}

fn required(name: &str) -> Result<String> {
    env::var(name).map_err(|_| anyhow::anyhow!("{name} must be set"))
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .unwrap_or_else(|_| "5000".to_string())
                    .parse()?,
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                cors_allowed_origins: env::var("ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| "http://localhost:3000".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect(),
            },
            queue: QueueConfig {
                workers: env::var("WORKER_COUNT")
                    .unwrap_or_else(|_| "3".to_string())
                    .parse()?,
                capacity: env::var("QUEUE_CAPACITY")
                    .unwrap_or_else(|_| "50".to_string())
                    .parse()?,
                job_timeout: match env::var("JOB_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "0".to_string())
                    .parse::<u64>()?
                {
                    0 => None,
                    secs => Some(Duration::from_secs(secs)),
                },
                storage_failure_policy: env::var("STORAGE_FAILURE_POLICY")
                    .unwrap_or_else(|_| "fail".to_string())
                    .parse()?,
            },
            analyzer: AnalyzerConfig {
                api_key: required("GENAI_KEY")?,
                model: env::var("GEMINI_MODEL")
                    .unwrap_or_else(|_| crate::analyzer::gemini::DEFAULT_MODEL.to_string()),
                api_base: env::var("GEMINI_API_BASE").ok(),
            },
            storage: StorageConfig {
                bucket: required("BUCKET_NAME")?,
                account_id: required("ACCOUNT_ID")?,
                access_key: required("BUCKET_ACCESS_KEY")?,
                secret_key: required("BUCKET_SECRET_KEY")?,
            },
        };

        if config.queue.workers == 0 {
            anyhow::bail!("WORKER_COUNT must be at least 1");
        }
        if config.queue.capacity == 0 {
            anyhow::bail!("QUEUE_CAPACITY must be at least 1");
        }

        Ok(config)
    }
}
