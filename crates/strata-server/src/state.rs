use anyhow::{Context, Result};
use std::sync::Arc;
use strata::services::{ArtifactRepository, ConfigService, StrataConfig};

#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<ArtifactRepository>,
    pub config: StrataConfig,
}

impl AppState {
    /// Build state from the config file plus `STRATA_*` environment overrides
    pub fn from_env() -> Result<Self> {
        let config_service = ConfigService::from_default_location()?;
        let config = config_service.load()?;
        let root = config_service
            .resolve_storage_root()
            .context("Failed to resolve storage root")?;

        tracing::info!(root = %root.display(), "serving artifacts");
        Ok(Self::new(Arc::new(ArtifactRepository::open(root)), config))
    }

    pub fn new(repository: Arc<ArtifactRepository>, config: StrataConfig) -> Self {
        Self { repository, config }
    }
}
