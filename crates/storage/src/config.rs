use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::local::LocalPublisher;
use crate::publisher::{ArtifactPublisher, PublishError};
use crate::retry::{RetryConfig, RetryingPublisher};
use crate::s3::{S3Publisher, S3Settings};

/// Default public base URL for the local backend (served by the API at `/files`).
pub const DEFAULT_LOCAL_BASE_URL: &str = "http://localhost:8000/files";

/// Default S3 region.
pub const DEFAULT_S3_REGION: &str = "us-east-1";

/// Where published stems go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// Copy into `publish_dir`, reachable at `base_url`.
    Local { publish_dir: PathBuf, base_url: String },
    S3(S3Settings),
}

impl StorageBackend {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Local { .. } => "local",
            Self::S3(_) => "s3",
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub retry: RetryConfig,
}

impl StorageConfig {
    /// Load storage configuration from environment variables.
    ///
    /// | Env Var                    | Default                          |
    /// |----------------------------|----------------------------------|
    /// | `STORAGE_BACKEND`          | `local`                          |
    /// | `STORAGE_BASE_URL`         | `http://localhost:8000/files`    |
    /// | `LOCAL_PUBLISH_DIR`        | `<work_dir>/published`           |
    /// | `S3_BUCKET`                | required for `s3`                |
    /// | `S3_REGION`                | `us-east-1`                      |
    /// | `S3_ENDPOINT`              | unset (AWS)                      |
    /// | `S3_PREFIX`                | unset                            |
    /// | `S3_ACCESS_KEY_ID`         | unset (default AWS chain)        |
    /// | `S3_SECRET_ACCESS_KEY`     | unset (default AWS chain)        |
    /// | `PUBLISH_MAX_ATTEMPTS`     | `1`                              |
    /// | `PUBLISH_RETRY_BACKOFF_MS` | `500`                            |
    pub fn from_env(work_dir: &Path) -> Self {
        Self::from_lookup(work_dir, |name| std::env::var(name).ok())
            .unwrap_or_else(|e| panic!("Invalid storage configuration: {e}"))
    }

    /// Same as [`from_env`](Self::from_env) but reading variables through
    /// `lookup`. Blank values count as unset.
    pub fn from_lookup(
        work_dir: &Path,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, PublishError> {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let base_url = var("STORAGE_BASE_URL");

        let backend = match var("STORAGE_BACKEND").as_deref().unwrap_or("local") {
            "local" => StorageBackend::Local {
                publish_dir: var("LOCAL_PUBLISH_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| work_dir.join("published")),
                base_url: base_url.unwrap_or_else(|| DEFAULT_LOCAL_BASE_URL.to_string()),
            },
            "s3" => StorageBackend::S3(S3Settings {
                bucket: var("S3_BUCKET").unwrap_or_default(),
                region: var("S3_REGION").unwrap_or_else(|| DEFAULT_S3_REGION.to_string()),
                endpoint: var("S3_ENDPOINT"),
                prefix: var("S3_PREFIX"),
                access_key_id: var("S3_ACCESS_KEY_ID"),
                secret_access_key: var("S3_SECRET_ACCESS_KEY"),
                public_base_url: base_url,
            }),
            other => {
                return Err(PublishError::Config(format!(
                    "Unknown STORAGE_BACKEND '{other}'. Must be one of: local, s3"
                )))
            }
        };

        let defaults = RetryConfig::default();
        let max_attempts = match var("PUBLISH_MAX_ATTEMPTS") {
            Some(raw) => raw.parse().map_err(|_| {
                PublishError::Config("PUBLISH_MAX_ATTEMPTS must be a valid u32".into())
            })?,
            None => defaults.max_attempts,
        };
        let initial_delay = match var("PUBLISH_RETRY_BACKOFF_MS") {
            Some(raw) => Duration::from_millis(raw.parse().map_err(|_| {
                PublishError::Config("PUBLISH_RETRY_BACKOFF_MS must be a valid u64".into())
            })?),
            None => defaults.initial_delay,
        };

        let config = Self {
            backend,
            retry: RetryConfig {
                max_attempts,
                initial_delay,
                ..defaults
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Check required settings for the selected backend.
    pub fn validate(&self) -> Result<(), PublishError> {
        match &self.backend {
            StorageBackend::Local { base_url, .. } if base_url.trim().is_empty() => Err(
                PublishError::Config("Backend 'local' requires a non-empty base URL".into()),
            ),
            StorageBackend::S3(s3) if s3.bucket.trim().is_empty() => Err(PublishError::Config(
                "Backend 's3' requires S3_BUCKET".into(),
            )),
            StorageBackend::S3(s3) if s3.region.trim().is_empty() => Err(PublishError::Config(
                "Backend 's3' requires S3_REGION".into(),
            )),
            _ => {
                if self.retry.max_attempts == 0 {
                    return Err(PublishError::Config(
                        "PUBLISH_MAX_ATTEMPTS must be at least 1".into(),
                    ));
                }
                Ok(())
            }
        }
    }

    /// Directory the API should serve at `/files`, if the backend is local.
    pub fn local_publish_dir(&self) -> Option<&Path> {
        match &self.backend {
            StorageBackend::Local { publish_dir, .. } => Some(publish_dir),
            StorageBackend::S3(_) => None,
        }
    }

    /// Construct the configured publisher, wrapped in retries when enabled.
    pub async fn build_publisher(&self) -> Result<Arc<dyn ArtifactPublisher>, PublishError> {
        let publisher: Arc<dyn ArtifactPublisher> = match &self.backend {
            StorageBackend::Local {
                publish_dir,
                base_url,
            } => {
                tokio::fs::create_dir_all(publish_dir)
                    .await
                    .map_err(|source| PublishError::Io {
                        path: publish_dir.clone(),
                        source,
                    })?;
                Arc::new(LocalPublisher::new(publish_dir.clone(), base_url.clone()))
            }
            StorageBackend::S3(settings) => Arc::new(S3Publisher::connect(settings.clone()).await?),
        };

        if self.retry.max_attempts > 1 {
            Ok(Arc::new(RetryingPublisher::new(publisher, self.retry.clone())))
        } else {
            Ok(publisher)
        }
    }
}
