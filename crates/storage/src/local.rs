//! Local-directory publisher.
//!
//! Copies artifacts into a directory that the API serves under a public base
//! URL. Useful for single-host deployments and development.

use std::path::{Path, PathBuf};

use crate::publisher::{join_url, ArtifactPublisher, PublicReference, PublishError};

pub struct LocalPublisher {
    root: PathBuf,
    base_url: String,
}

impl LocalPublisher {
    /// `root` is where artifacts are copied to; `base_url` is the URL that
    /// `root` is served at.
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }

    /// Reject keys that would escape `root`.
    fn destination(&self, key: &str) -> Result<PathBuf, PublishError> {
        let relative = Path::new(key.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, std::path::Component::Normal(_)));
        if key.is_empty() || escapes {
            return Err(PublishError::Config(format!("invalid object key '{key}'")));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait::async_trait]
impl ArtifactPublisher for LocalPublisher {
    async fn publish(&self, local_path: &Path, key: &str) -> Result<PublicReference, PublishError> {
        let dest = self.destination(key)?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PublishError::Upload {
                    key: key.to_string(),
                    message: format!("cannot create {}: {e}", parent.display()),
                })?;
        }

        // A missing source is a read failure, not a storage failure.
        tokio::fs::metadata(local_path)
            .await
            .map_err(|source| PublishError::Io {
                path: local_path.to_path_buf(),
                source,
            })?;

        let bytes = tokio::fs::copy(local_path, &dest)
            .await
            .map_err(|e| PublishError::Upload {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        tracing::debug!(key, bytes, dest = %dest.display(), "Artifact published locally");

        Ok(join_url(&self.base_url, key))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn copies_artifact_and_keeps_source() {
        let src_dir = tempfile::tempdir().unwrap();
        let dest_dir = tempfile::tempdir().unwrap();
        let src = src_dir.path().join("vocals.mp3");
        tokio::fs::write(&src, b"stem-bytes").await.unwrap();

        let publisher = LocalPublisher::new(dest_dir.path(), "http://localhost:8000/files/");
        let url = publisher.publish(&src, "job-1/vocals.mp3").await.unwrap();

        assert_eq!(url, "http://localhost:8000/files/job-1/vocals.mp3");
        assert!(src.exists(), "publisher must not delete the local artifact");
        let copied = tokio::fs::read(dest_dir.path().join("job-1/vocals.mp3"))
            .await
            .unwrap();
        assert_eq!(copied, b"stem-bytes");
    }

    #[tokio::test]
    async fn missing_source_is_io_error() {
        let dest_dir = tempfile::tempdir().unwrap();
        let publisher = LocalPublisher::new(dest_dir.path(), "http://x");

        let err = publisher
            .publish(Path::new("/nonexistent/vocals.mp3"), "job/vocals.mp3")
            .await
            .unwrap_err();
        assert_matches!(err, PublishError::Io { .. });
    }

    #[tokio::test]
    async fn rejects_keys_escaping_root() {
        let dest_dir = tempfile::tempdir().unwrap();
        let publisher = LocalPublisher::new(dest_dir.path(), "http://x");

        let err = publisher
            .publish(Path::new("/etc/hostname"), "../outside.mp3")
            .await
            .unwrap_err();
        assert_matches!(err, PublishError::Config(_));
    }
}
