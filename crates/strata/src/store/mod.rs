//! Persistence for artifact metadata and version content.
//!
//! The repository talks to storage only through [`MetadataStore`] and [`VersionStore`].
//! The filesystem implementations lay artifacts out as described on [`PathResolver`].

pub mod atomic;
pub mod metadata;
pub mod paths;
pub mod version;

pub use metadata::FsMetadataStore;
pub use paths::PathResolver;
pub use version::FsVersionStore;

use crate::services::{ArtifactMetadata, Result};

/// Durable storage for the one metadata record per artifact
#[async_trait::async_trait]
pub trait MetadataStore: Send + Sync {
    /// Read the record, failing with `NotFound` if the artifact has none yet
    async fn read(&self, workspace: &str, id: &str) -> Result<ArtifactMetadata>;

    /// Replace the record wholesale. A failed write leaves the previous record intact.
    async fn write(&self, workspace: &str, id: &str, metadata: &ArtifactMetadata) -> Result<()>;

    /// Workspaces holding at least one artifact record
    async fn list_workspaces(&self) -> Result<Vec<String>>;

    /// Candidate artifact ids in a workspace. Entries may lack a readable record.
    async fn list_artifact_ids(&self, workspace: &str) -> Result<Vec<String>>;
}

/// Durable storage for immutable version content and the latest alias
#[async_trait::async_trait]
pub trait VersionStore: Send + Sync {
    /// Store content in a fresh version slot. Fails with `VersionConflict` if the slot
    /// already holds content.
    async fn write_version(
        &self,
        workspace: &str,
        id: &str,
        version: u64,
        content: &[u8],
    ) -> Result<()>;

    /// Replace the latest alias
    async fn write_latest(&self, workspace: &str, id: &str, content: &[u8]) -> Result<()>;

    /// Delete the latest alias. Only used to undo a create that never got a record.
    async fn remove_latest(&self, workspace: &str, id: &str) -> Result<bool>;

    async fn read_version(&self, workspace: &str, id: &str, version: u64) -> Result<Vec<u8>>;

    async fn read_latest(&self, workspace: &str, id: &str) -> Result<Vec<u8>>;

    /// Version slots present on disk, ascending. Includes unreferenced slots.
    async fn list_versions(&self, workspace: &str, id: &str) -> Result<Vec<u64>>;

    /// Delete a version slot. Only used to reclaim slots no metadata refers to.
    async fn remove_version(&self, workspace: &str, id: &str, version: u64) -> Result<bool>;
}
