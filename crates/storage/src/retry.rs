//! Bounded retry with exponential backoff around any publisher.
//!
//! Disabled by default (`max_attempts == 1`): a failed upload fails the job.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::publisher::{ArtifactPublisher, PublicReference, PublishError};

/// Tunable parameters for publish retries.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts including the first one. `1` disables retrying.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

/// Calculate the next backoff delay, clamped to [`RetryConfig::max_delay`].
pub fn next_delay(current: Duration, config: &RetryConfig) -> Duration {
    let next_ms = (current.as_millis() as f64 * config.multiplier) as u64;
    Duration::from_millis(next_ms).min(config.max_delay)
}

pub struct RetryingPublisher {
    inner: Arc<dyn ArtifactPublisher>,
    config: RetryConfig,
}

impl RetryingPublisher {
    pub fn new(inner: Arc<dyn ArtifactPublisher>, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait::async_trait]
impl ArtifactPublisher for RetryingPublisher {
    async fn publish(&self, local_path: &Path, key: &str) -> Result<PublicReference, PublishError> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut delay = self.config.initial_delay;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match self.inner.publish(local_path, key).await {
                Ok(reference) => return Ok(reference),
                // Configuration and read errors will not fix themselves.
                Err(e @ (PublishError::Config(_) | PublishError::Io { .. })) => return Err(e),
                Err(e) if attempt >= max_attempts => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        key,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Publish failed, retrying",
                    );
                    tokio::time::sleep(delay).await;
                    delay = next_delay(delay, &self.config);
                }
            }
        }
    }
}
