//! Persisted config (archive location, destination, etc.) in the app data directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::app_data;

const CONFIG_FILENAME: &str = "config.toml";

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Archive processed by `run` when none is given on the command line.
    pub archive: Option<String>,
    /// Directory new archives land in; the newest one is processed.
    pub source_dir: Option<String>,
    /// Where flattened records are published. Cleared on every run.
    pub dest_dir: Option<String>,
    /// Extraction staging area. Defaults to `<app data>/vault`.
    pub work_dir: Option<String>,
    /// error | warn | info | debug | trace
    pub log_level: Option<String>,
}

impl Config {
    pub fn archive(&self) -> Option<PathBuf> {
        non_empty(&self.archive)
    }

    pub fn source_dir(&self) -> Option<PathBuf> {
        non_empty(&self.source_dir)
    }

    pub fn dest_dir(&self) -> Option<PathBuf> {
        non_empty(&self.dest_dir)
    }

    /// Configured working directory, or the default one in app data.
    pub fn work_dir(&self) -> Option<PathBuf> {
        non_empty(&self.work_dir).or_else(app_data::default_work_dir)
    }
}

fn non_empty(value: &Option<String>) -> Option<PathBuf> {
    value
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
}

/// Path of the default config file, if the app data directory is available.
pub fn default_config_path() -> Option<PathBuf> {
    app_data::app_data_dir().map(|d| d.join(CONFIG_FILENAME))
}

/// Load config from the app data directory. Returns default config if missing or invalid.
pub fn load_config() -> Config {
    let Some(path) = default_config_path() else {
        return Config::default();
    };
    let Ok(s) = std::fs::read_to_string(&path) else {
        return Config::default();
    };
    toml::from_str(&s).unwrap_or_default()
}

/// Load config from an explicit file. Unlike [`load_config`], failures are errors.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let s = std::fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
    toml::from_str(&s).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
}

/// Save config to the app data directory.
pub fn save_config(config: &Config) -> Result<PathBuf, ConfigError> {
    let path = default_config_path().ok_or(ConfigError::NoDataDir)?;
    save_config_to(config, &path)?;
    Ok(path)
}

/// Save config to `path`.
pub fn save_config_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    let s = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;
    std::fs::write(path, s).map_err(ConfigError::Write)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine app data directory")]
    NoDataDir,
    #[error("failed to read config {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("invalid config {0}: {1}")]
    Parse(PathBuf, toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("failed to write config: {0}")]
    Write(std::io::Error),
}
