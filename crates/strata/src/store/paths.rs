use std::path::{Path, PathBuf};

/// File holding the artifact's metadata record
pub const METADATA_FILE: &str = "metadata.json";
/// File holding content inside a version slot or the latest alias
pub const CONTENT_FILE: &str = "index.html";

const LATEST_DIR: &str = "latest";
const VERSIONS_DIR: &str = "versions";

/// Maps artifact identity to locations under the storage root.
///
/// ```text
/// <root>/<workspace>/<id>/metadata.json
/// <root>/<workspace>/<id>/latest/index.html
/// <root>/<workspace>/<id>/versions/v<N>/index.html
/// ```
///
/// Pure path composition: no I/O and no validation. Callers must only pass
/// identifiers that passed [`crate::services::validate_identifier`].
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn workspace_root(&self, workspace: &str) -> PathBuf {
        self.root.join(workspace)
    }

    pub fn artifact_root(&self, workspace: &str, id: &str) -> PathBuf {
        self.workspace_root(workspace).join(id)
    }

    pub fn metadata_location(&self, workspace: &str, id: &str) -> PathBuf {
        self.artifact_root(workspace, id).join(METADATA_FILE)
    }

    pub fn latest_location(&self, workspace: &str, id: &str) -> PathBuf {
        self.artifact_root(workspace, id)
            .join(LATEST_DIR)
            .join(CONTENT_FILE)
    }

    pub fn versions_root(&self, workspace: &str, id: &str) -> PathBuf {
        self.artifact_root(workspace, id).join(VERSIONS_DIR)
    }

    /// Directory of a single version slot
    pub fn version_slot(&self, workspace: &str, id: &str, version: u64) -> PathBuf {
        self.versions_root(workspace, id)
            .join(version_dir_name(version))
    }

    pub fn version_location(&self, workspace: &str, id: &str, version: u64) -> PathBuf {
        self.version_slot(workspace, id, version).join(CONTENT_FILE)
    }
}

pub fn version_dir_name(version: u64) -> String {
    format!("v{}", version)
}

/// Parse a version slot directory name (`v12` -> 12).
pub fn parse_version_dir(name: &str) -> Option<u64> {
    let digits = name.strip_prefix('v')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
