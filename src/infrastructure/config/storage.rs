use super::app_config::AppConfig;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No platform config directory.
    #[error("failed to determine config directory")]
    ConfigDirNotFound,
    /// Reading the file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Locates and reads the configuration file.
pub struct StorageManager {
    config_dir: PathBuf,
}

impl StorageManager {
    /// Create a new `StorageManager`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the configuration directory cannot be determined.
    pub fn new() -> Result<Self, ConfigError> {
        let config_dir = AppConfig::default_config_dir().ok_or(ConfigError::ConfigDirNotFound)?;

        Ok(Self { config_dir })
    }

    /// Creates a new `StorageManager` with a specific directory (useful for testing).
    #[must_use]
    pub fn with_dir(path: PathBuf) -> Self {
        Self { config_dir: path }
    }

    /// Returns the configuration directory path.
    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Loads the application configuration.
    /// A missing file yields defaults; an unparsable one is reported and
    /// replaced by defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be read.
    pub fn load_config(&self, path_override: Option<&Path>) -> Result<AppConfig, ConfigError> {
        let config_path = path_override.map_or_else(
            || self.config_dir.join(CONFIG_FILE_NAME),
            Path::to_path_buf,
        );

        if !config_path.exists() {
            info!(
                "Config file not found at {:?}, using defaults.",
                config_path
            );
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&config_path)?;
        match toml::from_str::<AppConfig>(&content) {
            Ok(mut config) => {
                config.config = Some(config_path);
                Ok(config)
            }
            Err(e) => {
                warn!("Failed to parse config file: {}. Using defaults.", e);
                Ok(AppConfig::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::LogLevel;

    #[test]
    fn test_missing_file_yields_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::TempDir::new()?;
        let storage = StorageManager::with_dir(dir.path().to_path_buf());

        let config = storage.load_config(None)?;
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(config.config.is_none());
        Ok(())
    }

    #[test]
    fn test_loads_override_path() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("custom.toml");
        fs::write(&path, "log_level = \"warn\"\n[loader]\nrepeat_notifications = true\n")?;

        let storage = StorageManager::with_dir(dir.path().to_path_buf());
        let config = storage.load_config(Some(&path))?;

        assert_eq!(config.log_level, LogLevel::Warn);
        assert!(config.loader.repeat_notifications);
        assert_eq!(config.config.as_deref(), Some(path.as_path()));
        Ok(())
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::TempDir::new()?;
        fs::write(dir.path().join(CONFIG_FILE_NAME), "viewport_height = \"tall\"")?;

        let storage = StorageManager::with_dir(dir.path().to_path_buf());
        let config = storage.load_config(None)?;
        assert_eq!(config.viewport_height, 800);
        Ok(())
    }
}
