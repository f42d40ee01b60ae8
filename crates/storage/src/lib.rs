//! Result publishing.
//!
//! Uploads separated stems to object storage and hands back a public
//! reference. Publishers never delete the local artifact; cleanup belongs to
//! the job that produced it.

pub mod config;
pub mod local;
pub mod publisher;
pub mod retry;
pub mod s3;

pub use config::{StorageBackend, StorageConfig};
pub use publisher::{ArtifactPublisher, PublicReference, PublishError};
