//! Process configuration for the core.
//!
//! Values come from defaults or `VISTABUENA_*` environment variables. Invalid
//! values are reported, never silently replaced by defaults.

use crate::logging::{default_log_level, normalize_level};
use crate::store::{SqliteStore, StoreResult};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_DATA_DIR: &str = "VISTABUENA_DATA_DIR";
pub const ENV_DB_PATH: &str = "VISTABUENA_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "VISTABUENA_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "VISTABUENA_LOG_DIR";
pub const ENV_STORE_LATENCY_MS: &str = "VISTABUENA_STORE_LATENCY_MS";

const DB_FILE_NAME: &str = "vistabuena.sqlite3";
const LOG_DIR_NAME: &str = "logs";

#[derive(Debug)]
pub enum ConfigError {
    InvalidLogLevel(String),
    InvalidLatency(String),
    CurrentDir(std::io::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLogLevel(message) => write!(f, "{message}"),
            Self::InvalidLatency(value) => write!(
                f,
                "{ENV_STORE_LATENCY_MS} must be a whole number of milliseconds, got `{value}`"
            ),
            Self::CurrentDir(err) => write!(f, "cannot resolve working directory: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CurrentDir(err) => Some(err),
            Self::InvalidLogLevel(_) | Self::InvalidLatency(_) => None,
        }
    }
}

/// Logger settings consumed by `init_logging`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// One of `trace|debug|info|warn|error`.
    pub level: &'static str,
    /// Absolute directory for rolling log files.
    pub log_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub logging: LoggingConfig,
    /// Simulated latency before each store read/write; zero disables it.
    pub store_latency: Duration,
}

impl CoreConfig {
    /// Defaults rooted at `data_dir`.
    pub fn with_data_dir(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            db_path: data_dir.join(DB_FILE_NAME),
            logging: LoggingConfig {
                level: default_log_level(),
                log_dir: data_dir.join(LOG_DIR_NAME),
            },
            store_latency: Duration::ZERO,
        }
    }

    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable source.
    ///
    /// Relative paths are resolved against the working directory so the log
    /// directory is always absolute.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let value = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let cwd = std::env::current_dir().map_err(ConfigError::CurrentDir)?;

        let data_dir = cwd.join(value(ENV_DATA_DIR).unwrap_or_default());
        let mut config = Self::with_data_dir(&data_dir);

        if let Some(path) = value(ENV_DB_PATH) {
            config.db_path = cwd.join(path.trim());
        }
        if let Some(level) = value(ENV_LOG_LEVEL) {
            config.logging.level = normalize_level(&level).map_err(ConfigError::InvalidLogLevel)?;
        }
        if let Some(dir) = value(ENV_LOG_DIR) {
            config.logging.log_dir = cwd.join(dir.trim());
        }
        if let Some(raw) = value(ENV_STORE_LATENCY_MS) {
            let millis = raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidLatency(raw.clone()))?;
            config.store_latency = Duration::from_millis(millis);
        }

        Ok(config)
    }

    /// Opens the configured store file with the configured latency.
    pub fn open_store(&self) -> StoreResult<SqliteStore> {
        Ok(SqliteStore::open(&self.db_path)?.with_latency(self.store_latency))
    }
}
