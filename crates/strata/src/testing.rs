//! Test utilities for the strata crate
//!
//! This module provides reusable test doubles for unit and integration testing.
//! It includes in-memory implementations of the `MetadataStore` and `VersionStore`
//! traits and a repository rooted in a temporary directory.

use crate::services::{ArtifactMetadata, ArtifactRepository, Result, ServiceError};
use crate::store::{MetadataStore, PathResolver, VersionStore};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;

type Key = (String, String);

fn key(workspace: &str, id: &str) -> Key {
    (workspace.to_string(), id.to_string())
}

/// In-memory metadata store.
///
/// Thread-safe via Mutex, suitable for unit tests.
#[derive(Default)]
pub struct MemoryMetadataStore {
    records: Mutex<BTreeMap<Key, ArtifactMetadata>>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn read(&self, workspace: &str, id: &str) -> Result<ArtifactMetadata> {
        self.records
            .lock()
            .unwrap()
            .get(&key(workspace, id))
            .cloned()
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Artifact {}/{} not found", workspace, id))
            })
    }

    async fn write(&self, workspace: &str, id: &str, metadata: &ArtifactMetadata) -> Result<()> {
        self.records
            .lock()
            .unwrap()
            .insert(key(workspace, id), metadata.clone());
        Ok(())
    }

    async fn list_workspaces(&self) -> Result<Vec<String>> {
        let records = self.records.lock().unwrap();
        let workspaces: BTreeSet<String> = records.keys().map(|(ws, _)| ws.clone()).collect();
        Ok(workspaces.into_iter().collect())
    }

    async fn list_artifact_ids(&self, workspace: &str) -> Result<Vec<String>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .keys()
            .filter(|(ws, _)| ws == workspace)
            .map(|(_, id)| id.clone())
            .collect())
    }
}

/// In-memory version store.
///
/// Enforces the same no-overwrite rule on version slots as the filesystem store.
#[derive(Default)]
pub struct MemoryVersionStore {
    versions: Mutex<HashMap<Key, BTreeMap<u64, Vec<u8>>>>,
    latest: Mutex<HashMap<Key, Vec<u8>>>,
}

impl MemoryVersionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl VersionStore for MemoryVersionStore {
    async fn write_version(
        &self,
        workspace: &str,
        id: &str,
        version: u64,
        content: &[u8],
    ) -> Result<()> {
        let mut versions = self.versions.lock().unwrap();
        let slots = versions.entry(key(workspace, id)).or_default();
        if slots.contains_key(&version) {
            return Err(ServiceError::VersionConflict {
                workspace: workspace.to_string(),
                id: id.to_string(),
                version,
            });
        }
        slots.insert(version, content.to_vec());
        Ok(())
    }

    async fn write_latest(&self, workspace: &str, id: &str, content: &[u8]) -> Result<()> {
        self.latest
            .lock()
            .unwrap()
            .insert(key(workspace, id), content.to_vec());
        Ok(())
    }

    async fn remove_latest(&self, workspace: &str, id: &str) -> Result<bool> {
        Ok(self
            .latest
            .lock()
            .unwrap()
            .remove(&key(workspace, id))
            .is_some())
    }

    async fn read_version(&self, workspace: &str, id: &str, version: u64) -> Result<Vec<u8>> {
        self.versions
            .lock()
            .unwrap()
            .get(&key(workspace, id))
            .and_then(|slots| slots.get(&version))
            .cloned()
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Version {} of artifact {}/{} not found",
                    version, workspace, id
                ))
            })
    }

    async fn read_latest(&self, workspace: &str, id: &str) -> Result<Vec<u8>> {
        self.latest
            .lock()
            .unwrap()
            .get(&key(workspace, id))
            .cloned()
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Artifact {}/{} not found", workspace, id))
            })
    }

    async fn list_versions(&self, workspace: &str, id: &str) -> Result<Vec<u64>> {
        Ok(self
            .versions
            .lock()
            .unwrap()
            .get(&key(workspace, id))
            .map(|slots| slots.keys().copied().collect())
            .unwrap_or_default())
    }

    async fn remove_version(&self, workspace: &str, id: &str, version: u64) -> Result<bool> {
        Ok(self
            .versions
            .lock()
            .unwrap()
            .get_mut(&key(workspace, id))
            .is_some_and(|slots| slots.remove(&version).is_some()))
    }
}

/// Filesystem-backed repository living in a temporary directory.
///
/// The directory is removed when the fixture is dropped.
pub struct TempRepository {
    pub dir: tempfile::TempDir,
    pub repository: ArtifactRepository,
}

impl TempRepository {
    pub fn new() -> Self {
        let dir = tempfile::TempDir::new().expect("failed to create temp dir");
        let repository = ArtifactRepository::open(dir.path());
        Self { dir, repository }
    }

    /// Resolver for inspecting or tampering with the on-disk layout
    pub fn paths(&self) -> PathResolver {
        PathResolver::new(self.dir.path())
    }
}

impl Default for TempRepository {
    fn default() -> Self {
        Self::new()
    }
}
