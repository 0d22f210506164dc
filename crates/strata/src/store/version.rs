use super::atomic::{write_new, write_replace};
use super::paths::{parse_version_dir, PathResolver};
use super::VersionStore;
use crate::services::{Result, ServiceError};
use std::io::ErrorKind;
use std::path::Path;

/// Version content stored as one file per version slot plus a latest copy
pub struct FsVersionStore {
    paths: PathResolver,
}

impl FsVersionStore {
    pub fn new(paths: PathResolver) -> Self {
        Self { paths }
    }

    async fn read_content(path: &Path, missing: impl FnOnce() -> String) -> Result<Vec<u8>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(ServiceError::NotFound(missing())),
            Err(e) => Err(ServiceError::io(
                format!("Failed to read {}", path.display()),
                e,
            )),
        }
    }
}

#[async_trait::async_trait]
impl VersionStore for FsVersionStore {
    async fn write_version(
        &self,
        workspace: &str,
        id: &str,
        version: u64,
        content: &[u8],
    ) -> Result<()> {
        let path = self.paths.version_location(workspace, id, version);
        tracing::debug!(path = %path.display(), bytes = content.len(), "writing version content");

        match write_new(&path, content).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(ServiceError::VersionConflict {
                workspace: workspace.to_string(),
                id: id.to_string(),
                version,
            }),
            Err(e) => Err(ServiceError::io(
                format!("Failed to write {}", path.display()),
                e,
            )),
        }
    }

    async fn write_latest(&self, workspace: &str, id: &str, content: &[u8]) -> Result<()> {
        let path = self.paths.latest_location(workspace, id);
        tracing::debug!(path = %path.display(), bytes = content.len(), "writing latest alias");

        write_replace(&path, content)
            .await
            .map_err(|e| ServiceError::io(format!("Failed to write {}", path.display()), e))
    }

    async fn remove_latest(&self, workspace: &str, id: &str) -> Result<bool> {
        let path = self.paths.latest_location(workspace, id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ServiceError::io(
                format!("Failed to remove {}", path.display()),
                e,
            )),
        }
    }

    async fn read_version(&self, workspace: &str, id: &str, version: u64) -> Result<Vec<u8>> {
        let path = self.paths.version_location(workspace, id, version);
        Self::read_content(&path, || {
            format!("Version {} of artifact {}/{} not found", version, workspace, id)
        })
        .await
    }

    async fn read_latest(&self, workspace: &str, id: &str) -> Result<Vec<u8>> {
        let path = self.paths.latest_location(workspace, id);
        Self::read_content(&path, || format!("Artifact {}/{} not found", workspace, id)).await
    }

    async fn list_versions(&self, workspace: &str, id: &str) -> Result<Vec<u64>> {
        let root = self.paths.versions_root(workspace, id);
        let mut entries = match tokio::fs::read_dir(&root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(ServiceError::io(
                    format!("Failed to read directory {}", root.display()),
                    e,
                ))
            },
        };

        let mut versions = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            ServiceError::io(format!("Failed to read directory {}", root.display()), e)
        })? {
            if let Some(v) = parse_version_dir(&entry.file_name().to_string_lossy()) {
                versions.push(v);
            }
        }
        versions.sort_unstable();
        Ok(versions)
    }

    async fn remove_version(&self, workspace: &str, id: &str, version: u64) -> Result<bool> {
        let slot = self.paths.version_slot(workspace, id, version);
        match tokio::fs::remove_dir_all(&slot).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ServiceError::io(
                format!("Failed to remove {}", slot.display()),
                e,
            )),
        }
    }
}
