pub mod config;
pub mod locks;
pub mod repository;
pub mod types;

pub use config::ConfigService;
pub use locks::ArtifactLocks;
pub use repository::ArtifactRepository;
pub use types::{
    validate_identifier, ArtifactMetadata, Locator, ServerConfig, StorageConfig, StrataConfig,
    VersionRecord, WriteOutcome, IDENTIFIER_MAX_LENGTH,
};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("version {version} of artifact {workspace}/{id} already exists")]
    VersionConflict {
        workspace: String,
        id: String,
        version: u64,
    },

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed metadata for {0}: {1}")]
    Serialization(String, #[source] serde_json::Error),
}

impl ServiceError {
    /// Wrap an I/O error with a human-readable description of what was attempted.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        ServiceError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::NotFound(_))
    }
}

pub type Result<T, E = ServiceError> = std::result::Result<T, E>;
