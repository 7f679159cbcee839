//! Store configuration
//!
//! Resolution order (lowest to highest):
//! 1. Built-in defaults
//! 2. ~/.coursectl/config.toml
//! 3. ./coursectl.toml
//! 4. Environment (`DATABASE_URL`, `COURSECTL_MAX_CONNECTIONS`,
//!    `COURSECTL_ACQUIRE_TIMEOUT_SECS`), including values from `.env` files
//!
//! Files are layered per key: a file that sets only `max_connections` keeps
//! the `database_url` from the layer below. A file that exists but cannot be
//! read or parsed is an error; only a missing file is skipped.
//!
//! Command-line overrides are applied by the caller on the returned value.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CatalogError, Result};

pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_MAX_CONNECTIONS: &str = "COURSECTL_MAX_CONNECTIONS";
pub const ENV_ACQUIRE_TIMEOUT_SECS: &str = "COURSECTL_ACQUIRE_TIMEOUT_SECS";

/// Connection settings for the relational store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Upper bound on pooled connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long `acquire` waits before reporting the store unavailable
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

fn default_database_url() -> String {
    "postgres://localhost/coursectl".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout_secs() -> u64 {
    5
}

/// One config file's worth of settings; absent keys leave the lower layer alone
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    database_url: Option<String>,
    max_connections: Option<u32>,
    acquire_timeout_secs: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
        }
    }
}

/// Get the coursectl config directory path (~/.coursectl)
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".coursectl"))
}

/// Load `.env` from the current directory, then from ~/.coursectl/.env.
///
/// dotenvy never overwrites variables that are already set, so the first
/// file wins and the real environment wins over both.
pub fn load_dotenv() {
    if let Ok(path) = dotenvy::dotenv() {
        debug!("Loaded .env from current directory: {}", path.display());
    }

    if let Some(env_file) = config_dir().map(|dir| dir.join(".env")) {
        if env_file.exists() {
            match dotenvy::from_path(&env_file) {
                Ok(()) => debug!("Loaded .env from {}", env_file.display()),
                Err(e) => debug!("Failed to load {}: {}", env_file.display(), e),
            }
        }
    }
}

impl StoreConfig {
    /// Load from config files and the process environment.
    pub fn load() -> Result<Self> {
        load_dotenv();

        let mut files = Vec::new();
        if let Some(global) = config_dir().map(|d| d.join("config.toml")) {
            files.push(global);
        }
        files.push(PathBuf::from("coursectl.toml"));

        let config = Self::from_files(&files)?.with_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        info!(
            max_connections = config.max_connections,
            acquire_timeout_secs = config.acquire_timeout_secs,
            "Store configuration loaded"
        );
        Ok(config)
    }

    /// Defaults overlaid by each existing file in order, later files winning.
    pub fn from_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut config = Self::default();
        for path in paths {
            if let Some(layer) = read_toml(path.as_ref())? {
                config = config.overlay(layer);
            }
        }
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let layer: FileConfig = toml::from_str(contents)
            .map_err(|e| CatalogError::config(format!("invalid TOML: {}", e)))?;
        Ok(Self::default().overlay(layer))
    }

    fn overlay(mut self, layer: FileConfig) -> Self {
        if let Some(url) = layer.database_url {
            self.database_url = url;
        }
        if let Some(max) = layer.max_connections {
            self.max_connections = max;
        }
        if let Some(secs) = layer.acquire_timeout_secs {
            self.acquire_timeout_secs = secs;
        }
        self
    }

    /// Overlay values found through `lookup` (normally the environment).
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(url) = lookup(ENV_DATABASE_URL) {
            self.database_url = url;
        }
        if let Some(raw) = lookup(ENV_MAX_CONNECTIONS) {
            self.max_connections = raw.trim().parse().map_err(|_| {
                CatalogError::config(format!(
                    "{} must be a positive integer, got '{}'",
                    ENV_MAX_CONNECTIONS, raw
                ))
            })?;
        }
        if let Some(raw) = lookup(ENV_ACQUIRE_TIMEOUT_SECS) {
            self.acquire_timeout_secs = raw.trim().parse().map_err(|_| {
                CatalogError::config(format!(
                    "{} must be a number of seconds, got '{}'",
                    ENV_ACQUIRE_TIMEOUT_SECS, raw
                ))
            })?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database_url.trim().is_empty() {
            return Err(CatalogError::config("database_url cannot be empty"));
        }
        if self.max_connections == 0 {
            return Err(CatalogError::config("max_connections must be at least 1"));
        }
        if self.acquire_timeout_secs == 0 {
            return Err(CatalogError::config("acquire_timeout_secs must be at least 1"));
        }
        Ok(())
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

fn read_toml(path: &Path) -> Result<Option<FileConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path).map_err(|e| {
        CatalogError::config(format!("failed to read {}: {}", path.display(), e))
    })?;
    let layer = toml::from_str(&contents).map_err(|e| {
        CatalogError::config(format!("invalid TOML in {}: {}", path.display(), e))
    })?;
    debug!("Loaded config from {}", path.display());
    Ok(Some(layer))
}
