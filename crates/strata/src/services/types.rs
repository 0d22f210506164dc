use super::ServiceError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Maximum length of a workspace name or artifact id
pub const IDENTIFIER_MAX_LENGTH: usize = 128;

/// Persisted record describing an artifact and its full version history.
///
/// Serialized as `metadata.json` with camelCase keys and millisecond timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactMetadata {
    pub id: String,
    pub workspace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
    pub current_version: u64,
    pub versions: Vec<VersionRecord>,
}

/// One entry in an artifact's changelog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub version: u64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changelog: Option<String>,
    pub size: u64,
}

impl ArtifactMetadata {
    /// Build the record for a freshly created artifact holding version 1.
    pub fn initial(
        workspace: &str,
        id: &str,
        description: Option<String>,
        changelog: String,
        size: u64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.to_string(),
            workspace: workspace.to_string(),
            description,
            created_at: now,
            updated_at: now,
            current_version: 1,
            versions: vec![VersionRecord {
                version: 1,
                timestamp: now,
                changelog: Some(changelog),
                size,
            }],
        }
    }

    /// The version number the next write must claim, `None` once the counter is exhausted
    pub fn next_version(&self) -> Option<u64> {
        self.current_version.checked_add(1)
    }

    /// Append a record for `version` and advance the current pointer.
    pub fn push_version(
        &mut self,
        version: u64,
        changelog: String,
        size: u64,
        now: DateTime<Utc>,
    ) {
        self.versions.push(VersionRecord {
            version,
            timestamp: now,
            changelog: Some(changelog),
            size,
        });
        self.current_version = version;
        self.updated_at = now;
    }

    pub fn has_version(&self, version: u64) -> bool {
        self.versions.iter().any(|v| v.version == version)
    }

    /// Check the sequencing invariants: versions are exactly `1..=current_version` in order.
    pub fn is_consistent(&self) -> bool {
        self.current_version >= 1
            && self.current_version == self.versions.len() as u64
            && self
                .versions
                .iter()
                .enumerate()
                .all(|(i, v)| v.version == i as u64 + 1)
    }
}

/// URL path identifying where an artifact (or one of its versions) is served.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locator(String);

impl Locator {
    pub fn latest(workspace: &str, id: &str) -> Self {
        Self(format!("/{}/{}/", workspace, id))
    }

    pub fn version(workspace: &str, id: &str, version: u64) -> Self {
        Self(format!("/{}/{}/v{}/", workspace, id, version))
    }

    pub fn for_version(workspace: &str, id: &str, version: Option<u64>) -> Self {
        match version {
            Some(v) => Self::version(workspace, id, v),
            None => Self::latest(workspace, id),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Join the locator onto a public base URL such as `http://localhost:1337`.
    pub fn to_url(&self, base_url: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), self.0)
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of a successful create, update, or revert
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteOutcome {
    pub locator: Locator,
    pub version: u64,
}

/// Validate a workspace name or artifact id.
///
/// Identifiers become path segments, so only ASCII letters, digits, `-` and `_` are
/// accepted, between 1 and [`IDENTIFIER_MAX_LENGTH`] characters.
pub fn validate_identifier(label: &str, value: &str) -> Result<(), ServiceError> {
    if value.is_empty() {
        return Err(ServiceError::Validation(format!("{} must not be empty", label)));
    }

    if value.len() > IDENTIFIER_MAX_LENGTH {
        return Err(ServiceError::Validation(format!(
            "{} '{}' exceeds {} characters",
            label, value, IDENTIFIER_MAX_LENGTH
        )));
    }

    if let Some(bad) = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(ServiceError::Validation(format!(
            "{} '{}' contains invalid character '{}' (allowed: letters, digits, '-', '_')",
            label, value, bad
        )));
    }

    Ok(())
}

/// Configuration for the on-disk store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory holding one subdirectory per workspace.
    /// Default: platform data directory + "strata/artifacts"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}

/// Configuration for the read-path HTTP listener
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: String,
    pub public_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:1337".to_string(),
            public_url: "http://localhost:1337".to_string(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrataConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> ArtifactMetadata {
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        ArtifactMetadata::initial(
            "demo",
            "widget",
            Some("A widget".to_string()),
            "Initial version".to_string(),
            12,
            now,
        )
    }

    #[test]
    fn initial_metadata_starts_at_version_one() {
        let meta = sample();
        assert_eq!(meta.current_version, 1);
        assert_eq!(meta.versions.len(), 1);
        assert_eq!(meta.created_at, meta.updated_at);
        assert!(meta.is_consistent());
    }

    #[test]
    fn push_version_advances_pointer() {
        let mut meta = sample();
        let later = meta.updated_at + chrono::Duration::seconds(5);
        meta.push_version(2, "Version 2".to_string(), 40, later);

        assert_eq!(meta.current_version, 2);
        assert_eq!(meta.updated_at, later);
        assert_ne!(meta.created_at, meta.updated_at);
        assert!(meta.has_version(2));
        assert!(meta.is_consistent());
    }

    #[test]
    fn serializes_camel_case_with_millisecond_timestamps() {
        let meta = sample();
        let json = serde_json::to_value(&meta).unwrap();

        assert_eq!(json["currentVersion"], 1);
        assert_eq!(json["createdAt"], 1_700_000_000_123i64);
        assert_eq!(json["versions"][0]["timestamp"], 1_700_000_000_123i64);
        assert_eq!(json["versions"][0]["size"], 12);
        assert_eq!(json["description"], "A widget");
    }

    #[test]
    fn description_is_omitted_when_absent() {
        let mut meta = sample();
        meta.description = None;
        let json = serde_json::to_string(&meta).unwrap();
        assert!(!json.contains("description"));
    }

    #[test]
    fn gapped_history_is_inconsistent() {
        let mut meta = sample();
        let now = meta.updated_at;
        meta.push_version(3, "skipped".to_string(), 1, now);
        assert!(!meta.is_consistent());
    }

    #[test]
    fn empty_history_is_inconsistent() {
        let mut meta = sample();
        meta.versions.clear();
        meta.current_version = 0;
        assert!(!meta.is_consistent());
    }

    #[test]
    fn next_version_stops_at_counter_limit() {
        let mut meta = sample();
        assert_eq!(meta.next_version(), Some(2));

        meta.current_version = u64::MAX;
        assert_eq!(meta.next_version(), None);
    }

    #[test]
    fn locators_follow_read_path_routes() {
        assert_eq!(Locator::latest("demo", "widget").as_str(), "/demo/widget/");
        assert_eq!(Locator::version("demo", "widget", 3).as_str(), "/demo/widget/v3/");
        assert_eq!(
            Locator::latest("demo", "widget").to_url("http://localhost:1337/"),
            "http://localhost:1337/demo/widget/"
        );
    }

    #[test]
    fn validate_identifier_accepts_slugs() {
        assert!(validate_identifier("id", "my-widget_2").is_ok());
    }

    #[test]
    fn validate_identifier_rejects_path_tricks() {
        for bad in ["", "..", "a/b", "a b", ".hidden", "ünïcode"] {
            let err = validate_identifier("id", bad).unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)), "accepted {:?}", bad);
        }
    }

    #[test]
    fn validate_identifier_rejects_overlong() {
        let long = "a".repeat(IDENTIFIER_MAX_LENGTH + 1);
        assert!(validate_identifier("workspace", &long).is_err());
    }
}
