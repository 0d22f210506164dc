use super::types::StrataConfig;
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "strata";
const CONFIG_FILE: &str = "config.toml";

/// Service for configuration management
pub struct ConfigService {
    config_path: PathBuf,
}

impl ConfigService {
    /// Create a config service reading `<config_dir>/config.toml`
    pub fn new(config_dir: &Path) -> Self {
        let config_path = config_dir.join(CONFIG_FILE);
        Self { config_path }
    }

    /// Config service for the platform's default config directory.
    ///
    /// `STRATA_CONFIG_DIR` wins, then `$XDG_CONFIG_HOME/strata`, then the OS config dir.
    pub fn from_default_location() -> Result<Self> {
        let dir = default_config_dir()?;
        Ok(Self::new(&dir))
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Initialize configuration with defaults
    pub fn init(&self) -> Result<StrataConfig> {
        let config = StrataConfig::default();
        self.save(&config)?;
        Ok(config)
    }

    /// Load configuration from file, with env var overrides (STRATA_ prefix, __ separator)
    pub fn load(&self) -> Result<StrataConfig> {
        let mut figment = Figment::from(Serialized::defaults(StrataConfig::default()));

        if self.config_path.exists() {
            figment = figment.merge(Toml::file(&self.config_path));
        }

        figment = figment.merge(Env::prefixed("STRATA_").split("__"));

        let config: StrataConfig = figment.extract().context("Failed to load configuration")?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &StrataConfig) -> Result<()> {
        let content = toml::to_string_pretty(config).context("Failed to serialize config")?;

        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        std::fs::write(&self.config_path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Get a configuration value by dotted key
    pub fn get(&self, key: &str) -> Result<String> {
        let config = self.load()?;
        match key {
            "storage.root" => Ok(config
                .storage
                .root
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default()),
            "server.bind" => Ok(config.server.bind),
            "server.public_url" => Ok(config.server.public_url),
            _ => Err(anyhow::anyhow!("Unknown config key: {}", key)),
        }
    }

    /// Set a configuration value by dotted key.
    ///
    /// Only the file is updated; environment overrides still apply on the next load.
    pub fn set(&self, key: &str, value: String) -> Result<()> {
        let mut config = self.load_file()?;
        match key {
            "storage.root" => config.storage.root = Some(PathBuf::from(value)),
            "server.bind" => config.server.bind = value,
            "server.public_url" => config.server.public_url = value,
            _ => return Err(anyhow::anyhow!("Unknown config key: {}", key)),
        }
        self.save(&config)?;
        Ok(())
    }

    /// Resolve the storage root: configured value, else the platform data directory
    pub fn resolve_storage_root(&self) -> Result<PathBuf> {
        let config = self.load()?;
        match config.storage.root {
            Some(root) => Ok(root),
            None => default_storage_root(),
        }
    }

    /// Check if configuration exists
    pub fn exists(&self) -> bool {
        self.config_path.exists()
    }

    /// Defaults plus the file, without environment overrides
    fn load_file(&self) -> Result<StrataConfig> {
        let mut figment = Figment::from(Serialized::defaults(StrataConfig::default()));
        if self.config_path.exists() {
            figment = figment.merge(Toml::file(&self.config_path));
        }
        figment.extract().context("Failed to load configuration")
    }
}

fn env_dir(name: &str) -> Option<PathBuf> {
    std::env::var_os(name)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// `$XDG_DATA_HOME/strata/artifacts`, else `<OS data dir>/strata/artifacts`
pub fn default_storage_root() -> Result<PathBuf> {
    let data_dir = env_dir("XDG_DATA_HOME")
        .or_else(dirs::data_dir)
        .context("Could not determine a data directory; set storage.root")?;
    Ok(data_dir.join(APP_DIR).join("artifacts"))
}

/// `$STRATA_CONFIG_DIR`, else `$XDG_CONFIG_HOME/strata`, else `<OS config dir>/strata`
pub fn default_config_dir() -> Result<PathBuf> {
    if let Some(dir) = env_dir("STRATA_CONFIG_DIR") {
        return Ok(dir);
    }
    let config_dir = env_dir("XDG_CONFIG_HOME")
        .or_else(dirs::config_dir)
        .context("Could not determine a config directory; set STRATA_CONFIG_DIR")?;
    Ok(config_dir.join(APP_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn init_creates_default_config() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::new(temp_dir.path());

        let config = service.init().unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:1337");
        assert_eq!(config.server.public_url, "http://localhost:1337");
        assert!(config.storage.root.is_none());
    }

    #[test]
    fn init_creates_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::new(temp_dir.path());
        assert!(!service.exists());

        service.init().unwrap();
        assert!(service.exists());
    }

    #[test]
    fn load_without_init_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::new(temp_dir.path());
        let config = service.load().unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:1337");
    }

    #[test]
    fn set_persists_and_get_reads_back() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::new(temp_dir.path());

        service
            .set("server.public_url", "http://example.test:8080".to_string())
            .unwrap();

        assert_eq!(
            service.get("server.public_url").unwrap(),
            "http://example.test:8080"
        );
        assert!(service.exists());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::new(temp_dir.path());
        assert!(service.get("model.name").is_err());
        assert!(service.set("model.name", "x".to_string()).is_err());
    }

    #[test]
    fn resolve_storage_root_prefers_configured_path() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::new(temp_dir.path());
        let root = temp_dir.path().join("artifacts");
        service
            .set("storage.root", root.to_string_lossy().into_owned())
            .unwrap();

        assert_eq!(service.resolve_storage_root().unwrap(), root);
    }

    #[test]
    fn config_file_round_trips_through_toml() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::new(temp_dir.path());
        let mut config = StrataConfig::default();
        config.server.bind = "0.0.0.0:9000".to_string();
        service.save(&config).unwrap();

        let raw = std::fs::read_to_string(service.config_path()).unwrap();
        assert!(raw.contains("[server]"));
        assert_eq!(service.load().unwrap().server.bind, "0.0.0.0:9000");
    }
}
