//! Configuration loading

use plejd_scene::SceneOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub scenes: ScenesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Path to the cached site document (JSON)
    #[serde(default = "default_site_path")]
    pub path: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            path: default_site_path(),
        }
    }
}

fn default_site_path() -> String {
    "./site.json".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenesConfig {
    /// Also catalog scenes hidden from the site's scene list
    #[serde(default)]
    pub include_hidden: bool,
}

impl ScenesConfig {
    pub fn to_scene_options(&self) -> SceneOptions {
        SceneOptions {
            include_hidden: self.include_hidden,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Load configuration from file, falling back to defaults when it is missing
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}

/// Save default configuration to file
pub fn save_default_config(path: &Path) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(&Config::default())?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.site.path, "./site.json");
        assert_eq!(config.logging.level, "info");
        assert!(!config.scenes.include_hidden);
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plejd.toml");
        std::fs::write(
            &path,
            r#"
[scenes]
include_hidden = true
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert!(config.scenes.include_hidden);
        assert!(config.scenes.to_scene_options().include_hidden);
        assert_eq!(config.site, SiteConfig::default());
    }

    #[test]
    fn test_save_default_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plejd.toml");
        save_default_config(&path).unwrap();
        assert_eq!(load_config(&path).unwrap(), Config::default());
    }

    #[test]
    fn test_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plejd.toml");
        std::fs::write(&path, "[scenes\n").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::ParseError(_))));
    }
}
