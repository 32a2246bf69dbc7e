//! Configuration loading and management.
//!
//! Sources, lowest priority first:
//! 1. Built-in defaults
//! 2. A YAML file: `--config`, else `./todo-forest/config.yaml`, else
//!    `~/.todo-forest/config.yaml`
//! 3. Environment: `TODO_FOREST_DB_PATH`, `TODO_FOREST_FORMAT`
//! 4. Command line flags (applied by the binary)

use crate::format::OutputFormat;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub display: DisplayConfig,
}

/// Storage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from(".todo-forest/todos.db")
}

/// Output configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

impl Config {
    /// Load configuration from file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Candidate config files, in lookup order.
    pub fn default_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("todo-forest/config.yaml")];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".todo-forest").join("config.yaml"));
        }
        paths
    }

    /// Load from an explicit file, or the first default location that exists,
    /// then apply environment overrides.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None => match Self::default_paths().into_iter().find(|p| p.is_file()) {
                Some(path) => {
                    debug!(path = %path.display(), "Loading config");
                    Self::load(path)?
                }
                None => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply environment overrides from the given lookup.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db_path) = lookup("TODO_FOREST_DB_PATH") {
            self.store.db_path = PathBuf::from(db_path);
        }

        if let Some(format) = lookup("TODO_FOREST_FORMAT").and_then(|f| OutputFormat::from_str(&f)) {
            self.display.format = format;
        }
    }

    /// Ensure the database directory exists.
    pub fn ensure_db_dir(&self) -> Result<()> {
        if let Some(parent) = self.store.db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}
