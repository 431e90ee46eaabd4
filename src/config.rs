//! Adapter configuration: TOML files, environment overrides and defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::adapter::AdapterOptions;
use crate::errors::DbError;

pub const DEFAULT_DATABASE_URL: &str = "mongodb://localhost:27017/merlin";
pub const CONFIG_FILE_NAME: &str = "merlin-mongo.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterConfig {
    pub database_url: Option<String>,
    pub log_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_retention: Option<usize>,
}

impl AdapterConfig {
    /// # Errors
    /// Returns `Config` when the text is not valid TOML for this shape.
    pub fn from_toml_str(s: &str) -> Result<Self, DbError> {
        toml::from_str(s).map_err(|e| DbError::Config(e.to_string()))
    }

    /// # Errors
    /// Returns `Io` when the file cannot be read, `Config` when it does not parse.
    pub fn from_file(path: &Path) -> Result<Self, DbError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| DbError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Fills fields that are still unset from `other`.
    pub fn merge_missing(&mut self, other: Self) {
        if self.database_url.is_none() {
            self.database_url = other.database_url;
        }
        if self.log_dir.is_none() {
            self.log_dir = other.log_dir;
        }
        if self.log_level.is_none() {
            self.log_level = other.log_level;
        }
        if self.log_retention.is_none() {
            self.log_retention = other.log_retention;
        }
    }

    /// Overrides fields from environment variables:
    /// `MERLIN_MONGO_DATABASE_URL`, `MERLIN_MONGO_LOG_DIR`,
    /// `MERLIN_MONGO_LOG_LEVEL`, `MERLIN_MONGO_LOG_RETENTION`.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("MERLIN_MONGO_DATABASE_URL") {
            self.database_url = Some(url);
        }
        if let Some(dir) = lookup("MERLIN_MONGO_LOG_DIR") {
            self.log_dir = Some(PathBuf::from(dir));
        }
        if let Some(level) = lookup("MERLIN_MONGO_LOG_LEVEL") {
            self.log_level = Some(level);
        }
        if let Some(n) = lookup("MERLIN_MONGO_LOG_RETENTION").and_then(|s| s.parse().ok()) {
            self.log_retention = Some(n);
        }
    }

    pub fn database_url(&self) -> &str {
        self.database_url.as_deref().unwrap_or(DEFAULT_DATABASE_URL)
    }

    /// # Errors
    /// Returns `InvalidArgument` when the configured URL is unusable.
    pub fn adapter_options(&self) -> Result<AdapterOptions, DbError> {
        AdapterOptions::new(self.database_url())
    }
}

/// Candidate config files, highest precedence first.
pub fn config_paths(explicit: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(p) = explicit {
        paths.push(p.to_path_buf());
    }
    if let Ok(p) = std::env::var("MERLIN_MONGO_CONFIG") {
        paths.push(PathBuf::from(p));
    }
    if let Some(dir) = dirs_next::config_dir() {
        paths.push(dir.join(CONFIG_FILE_NAME));
    }
    if let Ok(cur) = std::env::current_dir() {
        paths.push(cur.join(CONFIG_FILE_NAME));
    }
    paths
}

/// Loads configuration. Precedence: env > explicit file > `MERLIN_MONGO_CONFIG`
/// > user config dir > working directory > defaults.
///
/// # Errors
/// Returns an error when the explicit file is missing or any present file is malformed.
pub fn load_config(explicit: Option<&Path>) -> Result<AdapterConfig, DbError> {
    if let Some(p) = explicit {
        if !p.exists() {
            return Err(DbError::Config(format!("config file not found: {}", p.display())));
        }
    }
    let mut cfg = AdapterConfig::default();
    for path in config_paths(explicit) {
        if path.exists() {
            log::debug!("loading config from {}", path.display());
            cfg.merge_missing(AdapterConfig::from_file(&path)?);
        }
    }
    cfg.apply_env();
    Ok(cfg)
}
