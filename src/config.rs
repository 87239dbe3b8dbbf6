// Configuration file and platform directories

use crate::filter::{FilterMode, SortMode};
use crate::store::Backend;
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const APP_NAME: &str = "duelist";
const CONFIG_FILE: &str = "config.yaml";

/// Overrides the config file location
pub const CONFIG_ENV: &str = "DUELIST_CONFIG";
/// Overrides the default data directory
pub const DATA_DIR_ENV: &str = "DUELIST_DATA_DIR";

/// User configuration, loaded from YAML
///
/// Every key is optional:
///
/// ```yaml
/// store_path: ~/school/tasks
/// backend: sqlite
/// default_filter: upcoming
/// default_sort: asc
/// color: false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Store directory; defaults to the platform data directory
    pub store_path: Option<PathBuf>,
    pub backend: Backend,
    pub default_filter: FilterMode,
    pub default_sort: SortMode,
    pub color: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: None,
            backend: Backend::default(),
            default_filter: FilterMode::default(),
            default_sort: SortMode::default(),
            color: true,
        }
    }
}

impl Config {
    /// Load configuration
    ///
    /// An explicit `path` must exist. Without one, the default location is used
    /// if present, otherwise defaults apply.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        match default_config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => {
                debug!("No config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).wrap_err_with(|| format!("Failed to read config file {:?}", path))?;
        let config = Self::from_yaml(&text).wrap_err_with(|| format!("Invalid config file {:?}", path))?;
        debug!(path = ?path, ?config, "Loaded config");
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Directory the task store lives in
    pub fn store_dir(&self) -> PathBuf {
        match &self.store_path {
            Some(path) => expand_home(path),
            None => data_dir(),
        }
    }
}

/// `DUELIST_CONFIG`, else `<config_dir>/duelist/config.yaml`
pub fn default_config_path() -> Option<PathBuf> {
    resolve_config_path(std::env::var_os(CONFIG_ENV))
}

fn resolve_config_path(env_override: Option<OsString>) -> Option<PathBuf> {
    if let Some(path) = env_override {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME).join(CONFIG_FILE))
}

/// `DUELIST_DATA_DIR`, else `<data_dir>/duelist`
pub fn data_dir() -> PathBuf {
    resolve_data_dir(std::env::var_os(DATA_DIR_ENV))
}

fn resolve_data_dir(env_override: Option<OsString>) -> PathBuf {
    if let Some(dir) = env_override {
        return PathBuf::from(dir);
    }
    dirs::data_dir()
        .map(|d| d.join(APP_NAME))
        .unwrap_or_else(|| PathBuf::from(".duelist"))
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
