//! Checker configuration, loaded from TOML.

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckerConfig {
    #[serde(default)]
    pub dns: DnsSettings,
}

/// Resolver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DnsSettings {
    /// Upper bound for a single query, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Resolver attempts per query.
    #[serde(default = "default_attempts")]
    pub attempts: usize,

    /// Nameservers to query. Empty means the system configuration.
    #[serde(default)]
    pub nameservers: Vec<IpAddr>,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_attempts() -> usize {
    2
}

impl Default for DnsSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            attempts: default_attempts(),
            nameservers: Vec::new(),
        }
    }
}

impl DnsSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl CheckerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}
