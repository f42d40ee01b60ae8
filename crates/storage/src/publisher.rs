use std::path::{Path, PathBuf};

use stemsplit_core::audio::AudioFormat;

/// Public URL (or URI) of a published artifact.
pub type PublicReference = String;

/// Errors from publishing an artifact.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// The local artifact could not be read.
    #[error("failed to read artifact {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The storage service rejected or failed the upload.
    #[error("failed to upload '{key}': {message}")]
    Upload { key: String, message: String },

    /// The publisher is misconfigured.
    #[error("storage misconfigured: {0}")]
    Config(String),
}

/// Uploads a local file under a destination key.
#[async_trait::async_trait]
pub trait ArtifactPublisher: Send + Sync {
    /// Publish `local_path` as `key` and return its public reference.
    ///
    /// Must leave `local_path` in place.
    async fn publish(&self, local_path: &Path, key: &str) -> Result<PublicReference, PublishError>;
}

/// Join a base URL and an object key with exactly one slash between them.
pub fn join_url(base_url: &str, key: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        key.trim_start_matches('/')
    )
}

/// MIME type for an artifact, derived from its extension.
pub fn content_type_for(path: &Path) -> &'static str {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(AudioFormat::from_extension)
        .map(AudioFormat::content_type)
        .unwrap_or("application/octet-stream")
}
