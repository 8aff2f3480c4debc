//! Store configuration.
//!
//! Loaded from TOML, by default `<config dir>/authtoken/authtoken.toml`:
//!
//! ```toml
//! data_dir = "/var/lib/authtoken"
//! db_name = "auth"
//! ttl_secs = 3600
//! backend = "sqlite"   # or "memory"
//! ```
//!
//! Every key is optional.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application name used for the config directory.
const APP_NAME: &str = "authtoken";

/// Config file name
const CONFIG_FILE: &str = "authtoken.toml";

/// Directory used when `data_dir` is left empty.
const DEFAULT_DATA_DIR: &str = "/tmp";

const DEFAULT_DB_NAME: &str = "auth";

/// Default token lifetime: 1 hour.
const DEFAULT_TTL_SECS: u64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the database file.
    pub data_dir: PathBuf,
    /// Database file stem; the file is `<data_dir>/<db_name>.db`.
    pub db_name: String,
    /// Token lifetime in seconds.
    pub ttl_secs: u64,
    pub backend: BackendKind,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            db_name: DEFAULT_DB_NAME.to_string(),
            ttl_secs: DEFAULT_TTL_SECS,
            backend: BackendKind::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Load `path` if given. Otherwise load the default location if a file
    /// exists there, and fall back to built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", APP_NAME)
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    pub fn db_path(&self) -> PathBuf {
        let dir = if self.data_dir.as_os_str().is_empty() {
            Path::new(DEFAULT_DATA_DIR)
        } else {
            self.data_dir.as_path()
        };
        dir.join(format!("{}.db", self.db_name))
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}
