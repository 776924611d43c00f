//! Core configuration model.
//!
//! # Responsibility
//! - Describe storage, logging and query settings consumed by core.
//! - Load settings from TOML with per-section defaults.
//!
//! # Invariants
//! - Configuration is passed explicitly; core keeps no mutable global settings.
//! - `query.default_per_page` never exceeds `query.max_per_page` after validation.

use crate::logging::default_log_level;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

const DEFAULT_DB_FILE_NAME: &str = "crawldesk.sqlite3";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_LOG_FILE_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_LOG_FILES: usize = 5;
const DEFAULT_PER_PAGE: u32 = 20;
const DEFAULT_MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Root configuration for the data-access core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub query: QueryConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database file path.
    pub path: PathBuf,
    /// Store-side lock wait; the core adds no deadline of its own.
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DB_FILE_NAME),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of `trace|debug|info|warn|error`.
    pub level: String,
    /// Absolute directory for rolling log files.
    pub dir: Option<PathBuf>,
    pub max_file_bytes: u64,
    pub keep_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            dir: None,
            max_file_bytes: DEFAULT_LOG_FILE_BYTES,
            keep_files: DEFAULT_LOG_FILES,
        }
    }
}

/// Query limits injected into every repository instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub default_per_page: u32,
    pub max_per_page: u32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_per_page: DEFAULT_PER_PAGE,
            max_per_page: DEFAULT_MAX_PER_PAGE,
        }
    }
}

impl CoreConfig {
    /// Parses and validates configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: CoreConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.query.max_per_page == 0 {
            return Err(ConfigError::Invalid(
                "query.max_per_page must be greater than zero".to_string(),
            ));
        }
        if self.query.default_per_page == 0
            || self.query.default_per_page > self.query.max_per_page
        {
            return Err(ConfigError::Invalid(format!(
                "query.default_per_page must be within 1..={}",
                self.query.max_per_page
            )));
        }
        if let Some(dir) = self.logging.dir.as_ref() {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "logging.dir must be an absolute path, got `{}`",
                    dir.display()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig};

    #[test]
    fn empty_document_uses_defaults() {
        let config = CoreConfig::from_toml_str("").unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.query.max_per_page, 100);
        assert_eq!(config.database.busy_timeout_ms, 5_000);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = CoreConfig::from_toml_str(
            r#"
            [query]
            max_per_page = 50

            [database]
            path = "/var/lib/crawldesk/news.db"
            "#,
        )
        .unwrap();
        assert_eq!(config.query.max_per_page, 50);
        assert_eq!(config.query.default_per_page, 20);
        assert_eq!(
            config.database.path.to_str(),
            Some("/var/lib/crawldesk/news.db")
        );
    }

    #[test]
    fn default_page_size_above_max_is_rejected() {
        let err = CoreConfig::from_toml_str(
            r#"
            [query]
            default_per_page = 80
            max_per_page = 40
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn relative_log_dir_is_rejected() {
        let err = CoreConfig::from_toml_str("[logging]\ndir = \"logs\"\n").unwrap_err();
        assert!(err.to_string().contains("absolute"));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crawldesk.toml");
        std::fs::write(&path, "[database]\nbusy_timeout_ms = 250\n").unwrap();

        let config = CoreConfig::load(&path).unwrap();
        assert_eq!(config.database.busy_timeout_ms, 250);
    }
}
