//! Application configuration loaded from a YAML `config` file.

use std::path::{Path, PathBuf};

use figment::providers::{Format, Yaml};
use figment::Figment;
use serde::Deserialize;

use crate::error::ConfigError;

/// Directories searched for the config file, in priority order.
pub const DEFAULT_CONFIG_DIRS: &[&str] = &[".", "/etc/conf"];

/// File names tried inside each search directory, in priority order.
pub const CONFIG_FILE_NAMES: &[&str] = &["config.yaml", "config.yml", "config"];

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Redis connection settings.
    pub redis: RedisConfig,
}

/// Redis endpoint settings. Every field is required.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct RedisConfig {
    /// Address as `host:port`.
    pub addr: String,

    /// Password; empty means no AUTH.
    pub password: String,

    /// Logical database index.
    pub db: i64,
}

// Keep the password out of logs and panics.
impl std::fmt::Debug for RedisConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisConfig")
            .field("addr", &self.addr)
            .field("password", &if self.password.is_empty() { "" } else { "***" })
            .field("db", &self.db)
            .finish()
    }
}

impl RedisConfig {
    /// Whether a password is configured.
    pub fn has_password(&self) -> bool {
        !self.password.is_empty()
    }
}

impl Config {
    /// Load configuration from the default search directories.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_DIRS)
    }

    /// Load configuration from the first config file found in `dirs`.
    pub fn load_from<P: AsRef<Path>>(dirs: &[P]) -> Result<Self, ConfigError> {
        let path = find_config_file(dirs).ok_or_else(|| ConfigError::NotFound {
            searched: dirs.iter().map(|d| d.as_ref().to_path_buf()).collect(),
        })?;

        tracing::debug!(path = %path.display(), "Reading config file");

        Figment::new()
            .merge(Yaml::file_exact(&path))
            .extract()
            .map_err(|e| ConfigError::Parse {
                path,
                source: Box::new(e),
            })
    }
}

/// Return the first existing config file, scanning directories in order.
pub fn find_config_file<P: AsRef<Path>>(dirs: &[P]) -> Option<PathBuf> {
    dirs.iter()
        .flat_map(|dir| {
            CONFIG_FILE_NAMES
                .iter()
                .map(move |name| dir.as_ref().join(name))
        })
        .find(|candidate| candidate.is_file())
}
