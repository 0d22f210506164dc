use super::locks::ArtifactLocks;
use super::types::{validate_identifier, ArtifactMetadata, Locator, VersionRecord, WriteOutcome};
use super::{Result, ServiceError};
use crate::store::{FsMetadataStore, FsVersionStore, MetadataStore, PathResolver, VersionStore};
use chrono::{DateTime, SubsecRound, Utc};
use std::path::PathBuf;
use std::sync::Arc;

const INITIAL_CHANGELOG: &str = "Initial version";

/// Versioned artifact repository.
///
/// Orchestrates every multi-step write. Each write stores the version content and the
/// latest alias before the metadata record that references them, so a failure part way
/// through can leave an unreferenced slot behind but never a record pointing at missing
/// content.
pub struct ArtifactRepository {
    metadata: Arc<dyn MetadataStore>,
    versions: Arc<dyn VersionStore>,
    locks: ArtifactLocks,
}

impl ArtifactRepository {
    /// Create a repository over the given stores
    pub fn new(metadata: Arc<dyn MetadataStore>, versions: Arc<dyn VersionStore>) -> Self {
        Self {
            metadata,
            versions,
            locks: ArtifactLocks::new(),
        }
    }

    /// Create a repository backed by the filesystem under `root`
    pub fn open(root: impl Into<PathBuf>) -> Self {
        let paths = PathResolver::new(root);
        Self::new(
            Arc::new(FsMetadataStore::new(paths.clone())),
            Arc::new(FsVersionStore::new(paths)),
        )
    }

    /// Store a new artifact as version 1.
    ///
    /// If the artifact already exists this behaves exactly like [`Self::update`], so
    /// re-running a creation is safe.
    pub async fn create(
        &self,
        workspace: &str,
        id: &str,
        content: &[u8],
        description: Option<String>,
        changelog: Option<String>,
    ) -> Result<WriteOutcome> {
        validate_ids(workspace, id)?;
        let _guard = self.locks.acquire(workspace, id).await;

        match self.metadata.read(workspace, id).await {
            Ok(existing) => {
                tracing::debug!(workspace, id, "artifact exists, appending a version");
                return self
                    .append_version(existing, content, normalize(changelog))
                    .await;
            },
            Err(ServiceError::NotFound(_)) => {},
            Err(e) => return Err(e),
        }

        self.versions
            .write_version(workspace, id, 1, content)
            .await?;

        let metadata = ArtifactMetadata::initial(
            workspace,
            id,
            normalize(description),
            normalize(changelog).unwrap_or_else(|| INITIAL_CHANGELOG.to_string()),
            content.len() as u64,
            now(),
        );
        if let Err(e) = self.publish(&metadata, content).await {
            self.roll_back(workspace, id, 1, None).await;
            return Err(e);
        }

        tracing::info!(workspace, id, version = 1, size = content.len(), "artifact created");
        Ok(WriteOutcome {
            locator: Locator::latest(workspace, id),
            version: 1,
        })
    }

    /// Append a new version to an existing artifact
    pub async fn update(
        &self,
        workspace: &str,
        id: &str,
        content: &[u8],
        changelog: Option<String>,
    ) -> Result<WriteOutcome> {
        validate_ids(workspace, id)?;
        let _guard = self.locks.acquire(workspace, id).await;

        let metadata = self.metadata.read(workspace, id).await?;
        self.append_version(metadata, content, normalize(changelog))
            .await
    }

    /// Append a new version whose content is copied from `target`.
    ///
    /// History is never rewritten: reverting from version 5 to 2 produces version 6.
    pub async fn revert(&self, workspace: &str, id: &str, target: u64) -> Result<WriteOutcome> {
        validate_ids(workspace, id)?;
        let _guard = self.locks.acquire(workspace, id).await;

        let metadata = self.metadata.read(workspace, id).await?;
        if !metadata.has_version(target) {
            return Err(version_not_found(workspace, id, target));
        }

        let content = self.versions.read_version(workspace, id, target).await?;
        self.append_version(
            metadata,
            &content,
            Some(format!("Reverted to version {}", target)),
        )
        .await
    }

    /// Read content of the latest version, or of a specific version
    pub async fn read(&self, workspace: &str, id: &str, version: Option<u64>) -> Result<Vec<u8>> {
        validate_ids(workspace, id)?;
        let metadata = self.metadata.read(workspace, id).await?;

        match version {
            Some(v) if !metadata.has_version(v) => Err(version_not_found(workspace, id, v)),
            Some(v) => self.versions.read_version(workspace, id, v).await,
            None => self.versions.read_latest(workspace, id).await,
        }
    }

    /// Full metadata record of an artifact
    pub async fn metadata(&self, workspace: &str, id: &str) -> Result<ArtifactMetadata> {
        validate_ids(workspace, id)?;
        self.metadata.read(workspace, id).await
    }

    /// Version records of an artifact, oldest first
    pub async fn history(&self, workspace: &str, id: &str) -> Result<Vec<VersionRecord>> {
        Ok(self.metadata(workspace, id).await?.versions)
    }

    /// Where an artifact, or one of its versions, is served.
    ///
    /// Fails with `NotFound` when the artifact or the requested version does not exist.
    pub async fn locator(&self, workspace: &str, id: &str, version: Option<u64>) -> Result<Locator> {
        let metadata = self.metadata(workspace, id).await?;
        if let Some(v) = version {
            if !metadata.has_version(v) {
                return Err(version_not_found(workspace, id, v));
            }
        }
        Ok(Locator::for_version(workspace, id, version))
    }

    /// Workspaces containing at least one artifact, sorted by name
    pub async fn list_workspaces(&self) -> Result<Vec<String>> {
        let mut workspaces = self.metadata.list_workspaces().await?;
        workspaces.sort();
        Ok(workspaces)
    }

    /// Artifacts in a workspace, most recently updated first.
    ///
    /// Best effort: entries without a readable metadata record are skipped.
    pub async fn list_artifacts(&self, workspace: &str) -> Result<Vec<ArtifactMetadata>> {
        validate_identifier("workspace", workspace)?;

        let ids: Vec<String> = self
            .metadata
            .list_artifact_ids(workspace)
            .await?
            .into_iter()
            .filter(|id| validate_identifier("id", id).is_ok())
            .collect();

        let reads = futures::future::join_all(
            ids.iter()
                .map(|id| self.metadata.read(workspace, id)),
        )
        .await;

        let mut artifacts: Vec<ArtifactMetadata> = ids
            .iter()
            .zip(reads)
            .filter_map(|(id, result)| match result {
                Ok(metadata) => Some(metadata),
                Err(e) => {
                    tracing::warn!(workspace, id = %id, error = %e, "skipping unreadable artifact");
                    None
                },
            })
            .collect();

        artifacts.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(artifacts)
    }

    /// Remove version slots numbered above the current version and realign the latest
    /// alias with the current version.
    ///
    /// Such slots are left behind when a process dies after storing content but before
    /// its metadata, and would make the next write of that number conflict. Returns the
    /// removed version numbers.
    pub async fn sweep_orphans(&self, workspace: &str, id: &str) -> Result<Vec<u64>> {
        validate_ids(workspace, id)?;
        let _guard = self.locks.acquire(workspace, id).await;

        let current = match self.metadata.read(workspace, id).await {
            Ok(metadata) => metadata.current_version,
            Err(ServiceError::NotFound(_)) => 0,
            Err(e) => return Err(e),
        };

        let mut removed = Vec::new();
        for version in self.versions.list_versions(workspace, id).await? {
            if version > current && self.versions.remove_version(workspace, id, version).await? {
                tracing::warn!(workspace, id, version, "removed orphaned version slot");
                removed.push(version);
            }
        }

        if current == 0 {
            if self.versions.remove_latest(workspace, id).await? {
                tracing::warn!(workspace, id, "removed latest alias of unrecorded artifact");
            }
            return Ok(removed);
        }

        let expected = self.versions.read_version(workspace, id, current).await?;
        let latest = match self.versions.read_latest(workspace, id).await {
            Ok(latest) => Some(latest),
            Err(ServiceError::NotFound(_)) => None,
            Err(e) => return Err(e),
        };
        if latest.as_deref() != Some(expected.as_slice()) {
            self.versions.write_latest(workspace, id, &expected).await?;
            tracing::warn!(workspace, id, version = current, "realigned latest alias");
        }
        Ok(removed)
    }

    /// Write the next version of `metadata`. Caller must hold the artifact lock.
    async fn append_version(
        &self,
        mut metadata: ArtifactMetadata,
        content: &[u8],
        changelog: Option<String>,
    ) -> Result<WriteOutcome> {
        let workspace = metadata.workspace.clone();
        let id = metadata.id.clone();
        let previous = metadata.current_version;
        let next = metadata.next_version().ok_or_else(|| {
            ServiceError::Validation(format!(
                "artifact {}/{} has no version numbers left",
                workspace, id
            ))
        })?;

        self.versions
            .write_version(&workspace, &id, next, content)
            .await?;

        metadata.push_version(
            next,
            changelog.unwrap_or_else(|| format!("Version {}", next)),
            content.len() as u64,
            now(),
        );
        if let Err(e) = self.publish(&metadata, content).await {
            self.roll_back(&workspace, &id, next, Some(previous)).await;
            return Err(e);
        }

        tracing::info!(
            workspace = %workspace,
            id = %id,
            version = next,
            size = content.len(),
            "artifact updated"
        );
        Ok(WriteOutcome {
            locator: Locator::latest(&workspace, &id),
            version: next,
        })
    }

    /// Point the latest alias at the new content, then commit the record that
    /// references it.
    async fn publish(&self, metadata: &ArtifactMetadata, content: &[u8]) -> Result<()> {
        self.versions
            .write_latest(&metadata.workspace, &metadata.id, content)
            .await?;
        self.metadata
            .write(&metadata.workspace, &metadata.id, metadata)
            .await
    }

    /// Undo a write whose slot was claimed but never committed. Caller must hold the
    /// artifact lock.
    ///
    /// Puts the latest alias back on `restore` (or removes it when the artifact has no
    /// record), then releases the `claimed` slot so a retry can take the same number.
    /// The slot is held until the alias is restored, so no other writer can publish in
    /// between. Failures here are logged; anything left over is what `sweep_orphans`
    /// repairs.
    async fn roll_back(&self, workspace: &str, id: &str, claimed: u64, restore: Option<u64>) {
        let restored = match restore {
            Some(current) => match self.versions.read_version(workspace, id, current).await {
                Ok(content) => self.versions.write_latest(workspace, id, &content).await,
                Err(e) => Err(e),
            },
            None => self.versions.remove_latest(workspace, id).await.map(|_| ()),
        };
        if let Err(e) = restored {
            tracing::warn!(
                workspace,
                id,
                version = claimed,
                error = %e,
                "failed to restore latest alias"
            );
        }

        match self.versions.remove_version(workspace, id, claimed).await {
            Ok(_) => tracing::warn!(workspace, id, version = claimed, "rolled back failed write"),
            Err(e) => tracing::warn!(
                workspace,
                id,
                version = claimed,
                error = %e,
                "failed to release version slot"
            ),
        }
    }
}

fn validate_ids(workspace: &str, id: &str) -> Result<()> {
    validate_identifier("workspace", workspace)?;
    validate_identifier("id", id)
}

fn version_not_found(workspace: &str, id: &str, version: u64) -> ServiceError {
    ServiceError::NotFound(format!(
        "Version {} of artifact {}/{} not found",
        version, workspace, id
    ))
}

/// Blank optional text is treated as absent
fn normalize(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty())
}

/// Current time at the millisecond precision metadata is persisted with
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryMetadataStore, MemoryVersionStore};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn memory_repository() -> (ArtifactRepository, Arc<MemoryMetadataStore>, Arc<MemoryVersionStore>) {
        let metadata = Arc::new(MemoryMetadataStore::new());
        let versions = Arc::new(MemoryVersionStore::new());
        let repo = ArtifactRepository::new(metadata.clone(), versions.clone());
        (repo, metadata, versions)
    }

    /// Version store that can be told to fail latest writes
    struct FlakyLatest {
        inner: MemoryVersionStore,
        fail_latest: AtomicBool,
    }

    #[async_trait::async_trait]
    impl VersionStore for FlakyLatest {
        async fn write_version(&self, ws: &str, id: &str, v: u64, content: &[u8]) -> Result<()> {
            self.inner.write_version(ws, id, v, content).await
        }

        async fn write_latest(&self, ws: &str, id: &str, content: &[u8]) -> Result<()> {
            if self.fail_latest.load(Ordering::SeqCst) {
                return Err(ServiceError::io(
                    "Failed to write latest",
                    std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                ));
            }
            self.inner.write_latest(ws, id, content).await
        }

        async fn remove_latest(&self, ws: &str, id: &str) -> Result<bool> {
            self.inner.remove_latest(ws, id).await
        }

        async fn read_version(&self, ws: &str, id: &str, v: u64) -> Result<Vec<u8>> {
            self.inner.read_version(ws, id, v).await
        }

        async fn read_latest(&self, ws: &str, id: &str) -> Result<Vec<u8>> {
            self.inner.read_latest(ws, id).await
        }

        async fn list_versions(&self, ws: &str, id: &str) -> Result<Vec<u64>> {
            self.inner.list_versions(ws, id).await
        }

        async fn remove_version(&self, ws: &str, id: &str, v: u64) -> Result<bool> {
            self.inner.remove_version(ws, id, v).await
        }
    }

    /// Metadata store that can be told to fail writes
    #[derive(Default)]
    struct FlakyMetadata {
        inner: MemoryMetadataStore,
        fail_writes: AtomicBool,
    }

    #[async_trait::async_trait]
    impl MetadataStore for FlakyMetadata {
        async fn read(&self, ws: &str, id: &str) -> Result<ArtifactMetadata> {
            self.inner.read(ws, id).await
        }

        async fn write(&self, ws: &str, id: &str, metadata: &ArtifactMetadata) -> Result<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(ServiceError::io(
                    "Failed to write metadata",
                    std::io::Error::new(std::io::ErrorKind::Other, "permission denied"),
                ));
            }
            self.inner.write(ws, id, metadata).await
        }

        async fn list_workspaces(&self) -> Result<Vec<String>> {
            self.inner.list_workspaces().await
        }

        async fn list_artifact_ids(&self, ws: &str) -> Result<Vec<String>> {
            self.inner.list_artifact_ids(ws).await
        }
    }

    fn flaky_metadata_repository() -> (ArtifactRepository, Arc<FlakyMetadata>, Arc<MemoryVersionStore>) {
        let metadata = Arc::new(FlakyMetadata::default());
        let versions = Arc::new(MemoryVersionStore::new());
        let repo = ArtifactRepository::new(metadata.clone(), versions.clone());
        (repo, metadata, versions)
    }

    #[tokio::test]
    async fn create_stores_version_one() {
        let (repo, _, _) = memory_repository();

        let outcome = repo
            .create("demo", "widget", b"<h1>v1</h1>", Some("A widget".into()), None)
            .await
            .unwrap();

        assert_eq!(outcome.version, 1);
        assert_eq!(outcome.locator.as_str(), "/demo/widget/");

        let meta = repo.metadata("demo", "widget").await.unwrap();
        assert_eq!(meta.description.as_deref(), Some("A widget"));
        assert_eq!(meta.versions[0].changelog.as_deref(), Some("Initial version"));
        assert_eq!(meta.versions[0].size, 11);
    }

    #[tokio::test]
    async fn create_on_existing_artifact_appends() {
        let (repo, _, _) = memory_repository();
        repo.create("demo", "widget", b"one", None, None)
            .await
            .unwrap();

        let outcome = repo
            .create("demo", "widget", b"two", Some("ignored".into()), Some("rerun".into()))
            .await
            .unwrap();

        assert_eq!(outcome.version, 2);
        let meta = repo.metadata("demo", "widget").await.unwrap();
        assert_eq!(meta.description, None);
        assert_eq!(meta.versions[1].changelog.as_deref(), Some("rerun"));
    }

    #[tokio::test]
    async fn update_requires_existing_artifact() {
        let (repo, _, versions) = memory_repository();

        let err = repo
            .update("demo", "ghost", b"content", None)
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(versions.list_versions("demo", "ghost").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_synthesizes_changelog() {
        let (repo, _, _) = memory_repository();
        repo.create("demo", "widget", b"one", None, None)
            .await
            .unwrap();
        repo.update("demo", "widget", b"two", Some("   ".into()))
            .await
            .unwrap();

        let history = repo.history("demo", "widget").await.unwrap();
        assert_eq!(history[1].changelog.as_deref(), Some("Version 2"));
    }

    #[tokio::test]
    async fn failed_latest_write_leaves_metadata_untouched() {
        let metadata = Arc::new(MemoryMetadataStore::new());
        let versions = Arc::new(FlakyLatest {
            inner: MemoryVersionStore::new(),
            fail_latest: AtomicBool::new(false),
        });
        let repo = ArtifactRepository::new(metadata.clone(), versions.clone());
        repo.create("demo", "widget", b"one", None, None)
            .await
            .unwrap();

        versions.fail_latest.store(true, Ordering::SeqCst);
        let err = repo
            .update("demo", "widget", b"two", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Io { .. }));

        let meta = repo.metadata("demo", "widget").await.unwrap();
        assert_eq!(meta.current_version, 1);
        assert_eq!(repo.read("demo", "widget", None).await.unwrap(), b"one");
        assert_eq!(
            versions.list_versions("demo", "widget").await.unwrap(),
            vec![1]
        );

        versions.fail_latest.store(false, Ordering::SeqCst);
        let outcome = repo
            .update("demo", "widget", b"two", None)
            .await
            .unwrap();
        assert_eq!(outcome.version, 2);
        assert_eq!(repo.read("demo", "widget", None).await.unwrap(), b"two");
    }

    #[tokio::test]
    async fn failed_metadata_write_rolls_back_update() {
        let (repo, metadata, versions) = flaky_metadata_repository();
        repo.create("demo", "widget", b"one", None, None)
            .await
            .unwrap();

        metadata.fail_writes.store(true, Ordering::SeqCst);
        let err = repo
            .update("demo", "widget", b"two", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Io { .. }));

        let meta = repo.metadata("demo", "widget").await.unwrap();
        assert_eq!(meta.current_version, 1);
        assert_eq!(repo.read("demo", "widget", None).await.unwrap(), b"one");
        assert_eq!(
            versions.list_versions("demo", "widget").await.unwrap(),
            vec![1]
        );

        metadata.fail_writes.store(false, Ordering::SeqCst);
        let outcome = repo
            .update("demo", "widget", b"two", None)
            .await
            .unwrap();
        assert_eq!(outcome.version, 2);
        assert_eq!(repo.read("demo", "widget", None).await.unwrap(), b"two");
        assert_eq!(
            repo.read("demo", "widget", None).await.unwrap(),
            repo.read("demo", "widget", Some(2)).await.unwrap()
        );
    }

    #[tokio::test]
    async fn failed_metadata_write_rolls_back_create() {
        let (repo, metadata, versions) = flaky_metadata_repository();

        metadata.fail_writes.store(true, Ordering::SeqCst);
        let err = repo
            .create("demo", "fresh", b"one", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Io { .. }));

        assert!(repo.metadata("demo", "fresh").await.unwrap_err().is_not_found());
        assert!(versions.list_versions("demo", "fresh").await.unwrap().is_empty());
        assert!(versions
            .read_latest("demo", "fresh")
            .await
            .unwrap_err()
            .is_not_found());

        metadata.fail_writes.store(false, Ordering::SeqCst);
        let outcome = repo
            .create("demo", "fresh", b"one", None, None)
            .await
            .unwrap();
        assert_eq!(outcome.version, 1);
        assert_eq!(repo.read("demo", "fresh", None).await.unwrap(), b"one");
    }

    #[tokio::test]
    async fn exhausted_version_counter_is_rejected() {
        let (repo, metadata, versions) = memory_repository();
        let mut record = ArtifactMetadata::initial(
            "demo",
            "widget",
            None,
            INITIAL_CHANGELOG.to_string(),
            3,
            now(),
        );
        record.current_version = u64::MAX;
        metadata.write("demo", "widget", &record).await.unwrap();

        let err = repo
            .update("demo", "widget", b"two", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(versions.list_versions("demo", "widget").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn orphaned_slot_blocks_until_swept() {
        let (repo, _, versions) = memory_repository();
        repo.create("demo", "widget", b"one", None, None)
            .await
            .unwrap();
        versions
            .write_version("demo", "widget", 2, b"orphan")
            .await
            .unwrap();

        let err = repo
            .update("demo", "widget", b"two", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::VersionConflict { version: 2, .. }));

        assert_eq!(repo.sweep_orphans("demo", "widget").await.unwrap(), vec![2]);
        let outcome = repo
            .update("demo", "widget", b"two", None)
            .await
            .unwrap();
        assert_eq!(outcome.version, 2);
        assert_eq!(repo.read("demo", "widget", Some(2)).await.unwrap(), b"two");
    }

    #[tokio::test]
    async fn sweep_realigns_latest_alias() {
        let (repo, _, versions) = memory_repository();
        repo.create("demo", "widget", b"one", None, None)
            .await
            .unwrap();
        repo.update("demo", "widget", b"two", None)
            .await
            .unwrap();

        // Residue of a process that died between its latest write and its metadata write.
        versions
            .write_version("demo", "widget", 3, b"three")
            .await
            .unwrap();
        versions
            .write_latest("demo", "widget", b"three")
            .await
            .unwrap();

        assert_eq!(repo.sweep_orphans("demo", "widget").await.unwrap(), vec![3]);
        assert_eq!(repo.read("demo", "widget", None).await.unwrap(), b"two");

        let outcome = repo
            .update("demo", "widget", b"three", None)
            .await
            .unwrap();
        assert_eq!(outcome.version, 3);
    }

    #[tokio::test]
    async fn sweep_clears_content_of_unrecorded_artifact() {
        let (repo, _, versions) = memory_repository();
        versions
            .write_version("demo", "fresh", 1, b"one")
            .await
            .unwrap();
        versions.write_latest("demo", "fresh", b"one").await.unwrap();

        assert_eq!(repo.sweep_orphans("demo", "fresh").await.unwrap(), vec![1]);
        assert!(versions
            .read_latest("demo", "fresh")
            .await
            .unwrap_err()
            .is_not_found());

        let outcome = repo
            .create("demo", "fresh", b"one", None, None)
            .await
            .unwrap();
        assert_eq!(outcome.version, 1);
    }

    #[tokio::test]
    async fn sweep_never_touches_referenced_versions() {
        let (repo, _, versions) = memory_repository();
        repo.create("demo", "widget", b"one", None, None)
            .await
            .unwrap();
        repo.update("demo", "widget", b"two", None)
            .await
            .unwrap();

        assert!(repo.sweep_orphans("demo", "widget").await.unwrap().is_empty());
        assert_eq!(
            versions.list_versions("demo", "widget").await.unwrap(),
            vec![1, 2]
        );
    }

    #[tokio::test]
    async fn revert_copies_content_forward() {
        let (repo, _, _) = memory_repository();
        repo.create("demo", "widget", b"one", None, None)
            .await
            .unwrap();
        repo.update("demo", "widget", b"two", None)
            .await
            .unwrap();

        let outcome = repo.revert("demo", "widget", 1).await.unwrap();

        assert_eq!(outcome.version, 3);
        assert_eq!(repo.read("demo", "widget", None).await.unwrap(), b"one");
        assert_eq!(repo.read("demo", "widget", Some(2)).await.unwrap(), b"two");
        let history = repo.history("demo", "widget").await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[2].changelog.as_deref(), Some("Reverted to version 1"));
    }

    #[tokio::test]
    async fn revert_to_unknown_version_is_not_found() {
        let (repo, _, _) = memory_repository();
        repo.create("demo", "widget", b"one", None, None)
            .await
            .unwrap();

        for target in [0, 2, 99] {
            let err = repo.revert("demo", "widget", target).await.unwrap_err();
            assert!(err.is_not_found(), "target {}", target);
        }
        assert_eq!(repo.metadata("demo", "widget").await.unwrap().current_version, 1);
    }

    #[tokio::test]
    async fn read_refuses_unreferenced_versions() {
        let (repo, _, versions) = memory_repository();
        repo.create("demo", "widget", b"one", None, None)
            .await
            .unwrap();
        versions
            .write_version("demo", "widget", 2, b"orphan")
            .await
            .unwrap();

        assert!(repo
            .read("demo", "widget", Some(2))
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn locator_checks_version_exists() {
        let (repo, _, _) = memory_repository();
        repo.create("demo", "widget", b"one", None, None)
            .await
            .unwrap();

        assert_eq!(
            repo.locator("demo", "widget", Some(1)).await.unwrap().as_str(),
            "/demo/widget/v1/"
        );
        assert!(repo
            .locator("demo", "widget", Some(2))
            .await
            .unwrap_err()
            .is_not_found());
        assert!(repo
            .locator("demo", "missing", None)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn invalid_identifiers_are_rejected_before_storage() {
        let (repo, metadata, _) = memory_repository();

        let err = repo
            .create("../etc", "passwd", b"x", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(metadata.list_workspaces().await.unwrap().is_empty());

        let err = repo.read("demo", "a/b", None).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn list_artifacts_orders_by_recent_update() {
        let (repo, _, _) = memory_repository();
        repo.create("demo", "first", b"1", None, None)
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        repo.create("demo", "second", b"2", None, None)
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        repo.update("demo", "first", b"1b", None)
            .await
            .unwrap();

        let ids: Vec<String> = repo
            .list_artifacts("demo")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn list_artifacts_of_unknown_workspace_is_empty() {
        let (repo, _, _) = memory_repository();
        assert!(repo.list_artifacts("nobody").await.unwrap().is_empty());
        assert!(repo.list_workspaces().await.unwrap().is_empty());
    }
}
