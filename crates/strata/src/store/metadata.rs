use super::atomic::{is_hidden, write_replace};
use super::paths::{PathResolver, METADATA_FILE};
use super::MetadataStore;
use crate::services::{ArtifactMetadata, Result, ServiceError};
use std::io::ErrorKind;
use std::path::Path;

/// Metadata records stored as pretty-printed `metadata.json` files
pub struct FsMetadataStore {
    paths: PathResolver,
}

impl FsMetadataStore {
    pub fn new(paths: PathResolver) -> Self {
        Self { paths }
    }

    /// Names of visible subdirectories, empty if `dir` does not exist.
    async fn subdirectories(dir: &Path) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(ServiceError::io(
                    format!("Failed to read directory {}", dir.display()),
                    e,
                ))
            },
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            ServiceError::io(format!("Failed to read directory {}", dir.display()), e)
        })? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_hidden(&name) {
                continue;
            }
            let is_dir = entry
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            if is_dir {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

#[async_trait::async_trait]
impl MetadataStore for FsMetadataStore {
    async fn read(&self, workspace: &str, id: &str) -> Result<ArtifactMetadata> {
        let path = self.paths.metadata_location(workspace, id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ServiceError::NotFound(format!(
                    "Artifact {}/{} not found",
                    workspace, id
                )))
            },
            Err(e) => {
                return Err(ServiceError::io(
                    format!("Failed to read {}", path.display()),
                    e,
                ))
            },
        };

        let metadata: ArtifactMetadata = serde_json::from_slice(&bytes)
            .map_err(|e| ServiceError::Serialization(format!("{}/{}", workspace, id), e))?;

        // A record is only trusted if it describes this artifact with a gapless history.
        let problem = if metadata.workspace != workspace || metadata.id != id {
            Some(format!(
                "record names {}/{}",
                metadata.workspace, metadata.id
            ))
        } else if !metadata.is_consistent() {
            Some(format!(
                "history is not versions 1..={} in order",
                metadata.current_version
            ))
        } else {
            None
        };

        match problem {
            Some(problem) => Err(ServiceError::Serialization(
                format!("{}/{}", workspace, id),
                serde::de::Error::custom(problem),
            )),
            None => Ok(metadata),
        }
    }

    async fn write(&self, workspace: &str, id: &str, metadata: &ArtifactMetadata) -> Result<()> {
        let path = self.paths.metadata_location(workspace, id);
        let bytes = serde_json::to_vec_pretty(metadata)
            .map_err(|e| ServiceError::Serialization(format!("{}/{}", workspace, id), e))?;

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "writing metadata");
        write_replace(&path, &bytes)
            .await
            .map_err(|e| ServiceError::io(format!("Failed to write {}", path.display()), e))
    }

    async fn list_workspaces(&self) -> Result<Vec<String>> {
        let mut workspaces = Vec::new();
        for workspace in Self::subdirectories(self.paths.root()).await? {
            for id in Self::subdirectories(&self.paths.workspace_root(&workspace)).await? {
                let record = self.paths.artifact_root(&workspace, &id).join(METADATA_FILE);
                if tokio::fs::try_exists(&record).await.unwrap_or(false) {
                    workspaces.push(workspace);
                    break;
                }
            }
        }
        Ok(workspaces)
    }

    async fn list_artifact_ids(&self, workspace: &str) -> Result<Vec<String>> {
        Self::subdirectories(&self.paths.workspace_root(workspace)).await
    }
}
