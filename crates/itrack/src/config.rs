//! Configuration file loading and parsing.
//!
//! itrack reads an optional `itrack.toml`. Every section is optional; if the
//! file is missing the system falls back to sensible defaults. Command-line
//! flags and environment variables override file values.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "itrack.toml";

/// Default SQLite database file.
pub const DEFAULT_DATABASE_PATH: &str = "itrack.db";

/// Special database path selecting a throwaway in-memory database.
pub const IN_MEMORY_DATABASE: &str = ":memory:";

/// Default server bind address.
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// Root configuration structure loaded from `itrack.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackerConfig {
    /// Database location (optional).
    pub database: Option<DatabaseConfig>,
    /// HTTP server settings (optional).
    pub server: Option<ServerConfig>,
    /// Log filter settings (optional).
    pub log: Option<LogConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path, or `:memory:` (default: "itrack.db").
    pub path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on (default: "127.0.0.1:3000").
    pub bind: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// `tracing` env-filter directive, e.g. "info" or "itrack=debug".
    pub filter: Option<String>,
}

impl TrackerConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        Self::parse(&content).with_context(|| format!("Failed to parse config from {:?}", path))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load `path` if given (it must exist), else `itrack.toml` in `dir` if
    /// present, else defaults.
    pub fn discover(path: Option<&Path>, dir: &Path) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let candidate = dir.join(DEFAULT_CONFIG_FILE);
                if candidate.exists() {
                    Self::from_file(&candidate)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Database path with default fallback.
    pub fn database_path(&self) -> String {
        self.database
            .as_ref()
            .and_then(|d| d.path.clone())
            .unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string())
    }

    /// Bind address with default fallback.
    pub fn bind(&self) -> String {
        self.server
            .as_ref()
            .and_then(|s| s.bind.clone())
            .unwrap_or_else(|| DEFAULT_BIND.to_string())
    }

    /// Log filter, if configured.
    pub fn log_filter(&self) -> Option<String> {
        self.log.as_ref().and_then(|l| l.filter.clone())
    }
}

/// Where the store lives, resolved from config and overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    InMemory,
    File(PathBuf),
}

impl DatabaseLocation {
    pub fn parse(raw: &str) -> Self {
        if raw == IN_MEMORY_DATABASE {
            DatabaseLocation::InMemory
        } else {
            DatabaseLocation::File(PathBuf::from(raw))
        }
    }

    /// Open the SQLite store at this location.
    pub fn open(&self) -> Result<crate::storage::SqliteStorage> {
        match self {
            DatabaseLocation::InMemory => crate::storage::SqliteStorage::open_in_memory(),
            DatabaseLocation::File(path) => crate::storage::SqliteStorage::open(path),
        }
    }
}
