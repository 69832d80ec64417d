use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE: &str = "config.toml";
const DEFAULT_PROBE_INTERVAL_SECS: u64 = 30;

/// Get the local data directory for fieldsync.
///
/// # Errors
///
/// Returns an error if the local data directory cannot be determined.
pub fn get_data_dir() -> Result<PathBuf> {
    let mut path =
        dirs::data_local_dir().ok_or_else(|| anyhow::anyhow!("Failed to get local data dir"))?;
    path.push("fieldsync");
    Ok(path)
}

/// Settings for the client binary, read from `config.toml` in the data directory
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api_url: Option<String>,
    pub api_token: Option<String>,
    pub database_path: Option<PathBuf>,
    pub probe_interval_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            api_token: None,
            database_path: None,
            probe_interval_secs: DEFAULT_PROBE_INTERVAL_SECS,
        }
    }
}

impl ClientConfig {
    /// Load from `path`; a missing file yields the defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Load `config.toml` from the data directory
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory is unknown or the file is invalid
    pub fn load_default() -> Result<Self> {
        Self::load(&get_data_dir()?.join(CONFIG_FILE))
    }

    /// Configured store location, or the data directory default
    ///
    /// # Errors
    ///
    /// Returns an error if no path is configured and the data directory is unknown
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(get_data_dir()?.join("fieldsync.db")),
        }
    }

    #[must_use]
    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs.max(1))
    }
}
