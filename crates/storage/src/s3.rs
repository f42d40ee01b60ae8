//! S3-compatible object storage publisher.
//!
//! Works against AWS S3 and S3-compatible services (MinIO, R2) through a
//! custom endpoint. Objects are stored under an optional key prefix.

use std::path::Path;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;

use crate::publisher::{content_type_for, join_url, ArtifactPublisher, PublicReference, PublishError};

/// Connection settings for an S3 bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Settings {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible services. Enables path-style
    /// addressing.
    pub endpoint: Option<String>,
    /// Key prefix prepended to every object key (no leading/trailing `/`).
    pub prefix: Option<String>,
    /// Static credentials; the default AWS provider chain is used when unset.
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Public base URL objects are reachable at. Derived from the bucket
    /// and endpoint when unset.
    pub public_base_url: Option<String>,
}

impl S3Settings {
    /// Full object key for a destination key.
    pub fn object_key(&self, key: &str) -> String {
        let key = key.trim_start_matches('/');
        match self.prefix.as_deref().map(|p| p.trim_matches('/')) {
            Some(prefix) if !prefix.is_empty() => format!("{prefix}/{key}"),
            _ => key.to_string(),
        }
    }

    /// Public reference for a stored object key.
    pub fn public_url(&self, object_key: &str) -> String {
        if let Some(base) = &self.public_base_url {
            return join_url(base, object_key);
        }
        match &self.endpoint {
            Some(endpoint) => join_url(&join_url(endpoint, &self.bucket), object_key),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, object_key
            ),
        }
    }
}

pub struct S3Publisher {
    client: aws_sdk_s3::Client,
    settings: S3Settings,
}

impl S3Publisher {
    /// Build a client from the settings and the ambient AWS configuration.
    pub async fn connect(settings: S3Settings) -> Result<Self, PublishError> {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);

        if let Some(endpoint) = &settings.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        match (&settings.access_key_id, &settings.secret_access_key) {
            (Some(id), Some(secret)) => {
                let credentials = Credentials::new(id, secret, None, None, "stemsplit-env");
                builder = builder.credentials_provider(credentials);
            }
            (None, None) => {}
            _ => {
                return Err(PublishError::Config(
                    "S3_ACCESS_KEY_ID and S3_SECRET_ACCESS_KEY must be set together".into(),
                ))
            }
        }

        tracing::info!(
            bucket = %settings.bucket,
            region = %settings.region,
            endpoint = ?settings.endpoint,
            "S3 publisher configured",
        );

        Ok(Self {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
            settings,
        })
    }
}

#[async_trait::async_trait]
impl ArtifactPublisher for S3Publisher {
    async fn publish(&self, local_path: &Path, key: &str) -> Result<PublicReference, PublishError> {
        tokio::fs::metadata(local_path)
            .await
            .map_err(|source| PublishError::Io {
                path: local_path.to_path_buf(),
                source,
            })?;

        let object_key = self.settings.object_key(key);

        let body = ByteStream::from_path(local_path)
            .await
            .map_err(|e| PublishError::Upload {
                key: object_key.clone(),
                message: e.to_string(),
            })?;

        self.client
            .put_object()
            .bucket(&self.settings.bucket)
            .key(&object_key)
            .content_type(content_type_for(local_path))
            .body(body)
            .send()
            .await
            .map_err(|e| PublishError::Upload {
                key: object_key.clone(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        tracing::debug!(bucket = %self.settings.bucket, key = %object_key, "Artifact uploaded");

        Ok(self.settings.public_url(&object_key))
    }
}
