use std::path::{Path, PathBuf};

use elite_types::MonitorConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("no --config given and no user config directory available")]
    NoConfigDir,

    #[error("`monitor` requires a `commanders` list in the config")]
    MissingCommanders,
}

/// `<config_dir>/elite-monitor/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("elite-monitor").join("config.toml"))
}

pub fn load(path: Option<&Path>) -> Result<MonitorConfig, ConfigError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => default_config_path().ok_or(ConfigError::NoConfigDir)?,
    };
    let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse { path, source })
}

/// Commanders to demultiplex, or `MissingCommanders` when none are configured.
pub fn commanders(config: &MonitorConfig) -> Result<&[String], ConfigError> {
    match config.commanders.as_deref() {
        Some(commanders) if !commanders.is_empty() => Ok(commanders),
        _ => Err(ConfigError::MissingCommanders),
    }
}
