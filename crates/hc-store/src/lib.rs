//! hc-store: artifact storage for finished HLS conversions.
//!
//! The [`ArtifactStore`] trait covers the two operations the pipeline needs
//! (existence check and single-object upload). [`S3ArtifactStore`] talks to
//! S3 or an S3 compatible service; [`MemoryArtifactStore`] keeps objects in
//! process for tests and dry runs. [`upload_folder`] publishes a scratch
//! directory's manifest and segments.

pub mod content_type;
pub mod memory;
pub mod s3;
pub mod upload;

use std::path::Path;

use async_trait::async_trait;

pub use content_type::{content_type_for, is_manifest};
pub use memory::MemoryArtifactStore;
pub use s3::S3ArtifactStore;
pub use upload::upload_folder;

/// Remote object store holding published artifacts.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Whether `key` exists in `bucket`.
    ///
    /// "Not found" maps to `Ok(false)`; every other failure is an
    /// [`hc_core::Error::Store`] and must not be read as absence.
    async fn exists(&self, bucket: &str, key: &str) -> hc_core::Result<bool>;

    /// Upload the file at `body` to `bucket`/`key` with the given content type.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: &Path,
        content_type: &str,
    ) -> hc_core::Result<()>;
}
