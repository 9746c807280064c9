//! Configuration loading with environment overrides.

use crate::schema::{Config, StoreBackend};
use skystats_common::{Result, StatsError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variables consulted after the file is read.
pub const ENV_BIND: &str = "SKYSTATS_BIND";
/// Overrides `bluesky.service_url`.
pub const ENV_SERVICE: &str = "BLUESKY_SERVICE";
/// Overrides `bluesky.identifier`.
pub const ENV_USERNAME: &str = "BLUESKY_USERNAME";
/// Overrides `bluesky.password`.
pub const ENV_PASSWORD: &str = "BLUESKY_PASSWORD";
/// Switches the cache to the file backend rooted at this directory.
pub const ENV_CACHE_DIR: &str = "SKYSTATS_CACHE_DIR";
/// Overrides `logging.level`.
pub const ENV_LOG: &str = "SKYSTATS_LOG";

/// Reads `skystats.toml` and layers the environment on top.
pub struct ConfigLoader {
    path: PathBuf,
}

impl ConfigLoader {
    /// Creates a new configuration loader.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path this loader reads.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the file, applies process environment overrides, and validates.
    pub async fn load(&self) -> Result<Config> {
        let mut config = self.load_file().await?;
        apply_env_overrides(&mut config, |key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Reads the TOML file; a missing file yields the defaults.
    pub async fn load_file(&self) -> Result<Config> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => {
                debug!("Parsing configuration from {}", self.path.display());
                Ok(toml::from_str(&contents)?)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(
                    "No configuration file at {}, using defaults",
                    self.path.display()
                );
                Ok(Config::default())
            }
            Err(e) => Err(StatsError::config_with_source(
                format!("Failed to read {}", self.path.display()),
                e,
            )),
        }
    }
}

/// Applies environment overrides through `lookup`, which maps a variable name to its value.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(bind) = lookup(ENV_BIND) {
        config.server.bind_addr = bind;
    }
    if let Some(service) = lookup(ENV_SERVICE) {
        config.bluesky.service_url = service;
    }
    if let Some(username) = lookup(ENV_USERNAME) {
        config.bluesky.identifier = Some(username);
    }
    if let Some(password) = lookup(ENV_PASSWORD) {
        config.bluesky.password = Some(password);
    }
    if let Some(directory) = lookup(ENV_CACHE_DIR) {
        config.cache.backend = StoreBackend::File {
            directory: directory.into(),
        };
    }
    if let Some(level) = lookup(ENV_LOG) {
        config.logging.level = level;
    }
}
