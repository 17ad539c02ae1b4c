//! Project configuration (sitewright.toml).

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use sitewright_pipeline::PathRegistry;

/// Errors loading the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {message}")]
    ReadError { path: String, message: String },

    #[error("Failed to parse {path}: {message}")]
    ParseError { path: String, message: String },
}

/// Configuration file structure.
#[derive(Debug, Default, Deserialize)]
pub struct ProjectConfig {
    /// Paths, vendor copies and per-task settings
    #[serde(flatten)]
    pub registry: PathRegistry,

    #[serde(default)]
    pub server: ServerSettings,
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub port: u16,
    pub host: String,
    pub open: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "127.0.0.1".to_string(),
            open: true,
        }
    }
}

/// Resolve the config path against the project root.
pub fn config_path(root: &Path, config: &Path) -> PathBuf {
    if config.is_absolute() {
        config.to_path_buf()
    } else {
        root.join(config)
    }
}

/// Load the configuration if the file exists.
///
/// A missing file yields the stock layout; a malformed one is an error.
pub fn load(path: &Path) -> Result<ProjectConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!("No {} found, using defaults", path.display());
        return Ok(ProjectConfig::default());
    }

    let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    tracing::info!("Loaded config from {}", path.display());
    Ok(config)
}
