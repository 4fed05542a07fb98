//! Core runtime configuration.
//!
//! # Responsibility
//! - Load `CoreConfig` from a TOML file with serde defaults.
//! - Apply `WSMASTER_*` environment overrides on top of the file values.
//!
//! # Invariants
//! - A loaded config is always validated before it is returned.

use crate::db::DbOptions;
use crate::logging::parse_level;
use log::info;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_DB_PATH: &str = "WSMASTER_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "WSMASTER_LOG_LEVEL";
pub const ENV_CASCADE_LOG_LEVEL: &str = "WSMASTER_CASCADE_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "WSMASTER_LOG_DIR";
pub const ENV_BUSY_TIMEOUT_MS: &str = "WSMASTER_BUSY_TIMEOUT_MS";

const DEFAULT_DATABASE_PATH: &str = "wsmaster.sqlite3";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: toml::de::Error },
    /// A field or environment override holds an unusable value.
    Invalid { field: &'static str, message: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse config `{}`: {source}", path.display())
            }
            Self::Invalid { field, message } => write!(f, "invalid config `{field}`: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Invalid { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    pub database_path: PathBuf,
    pub log_level: String,
    /// Level for the cascade modules; `log_level` applies when unset.
    pub cascade_log_level: Option<String>,
    /// Absolute directory for rolling log files; file logging is off when unset.
    pub log_dir: Option<PathBuf>,
    pub busy_timeout_ms: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            log_level: crate::logging::default_log_level().to_string(),
            cascade_log_level: None,
            log_dir: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl CoreConfig {
    /// Reads `path`, applies environment overrides and validates.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        info!(
            "event=config_load module=config status=ok source=file path={}",
            path.display()
        );
        Ok(config)
    }

    /// Defaults plus environment overrides, for runs without a config file.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        info!("event=config_load module=config status=ok source=env");
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Applies overrides resolved through `lookup`.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = lookup(ENV_DB_PATH) {
            self.database_path = PathBuf::from(value);
        }
        if let Some(value) = lookup(ENV_LOG_LEVEL) {
            self.log_level = value;
        }
        if let Some(value) = lookup(ENV_CASCADE_LOG_LEVEL) {
            self.cascade_log_level = Some(value);
        }
        if let Some(value) = lookup(ENV_LOG_DIR) {
            self.log_dir = Some(PathBuf::from(value));
        }
        if let Some(value) = lookup(ENV_BUSY_TIMEOUT_MS) {
            self.busy_timeout_ms =
                value
                    .trim()
                    .parse()
                    .map_err(|err| ConfigError::Invalid {
                        field: "busy_timeout_ms",
                        message: format!("`{value}` is not a number of milliseconds: {err}"),
                    })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                field: "database_path",
                message: "cannot be empty".to_string(),
            });
        }
        parse_level(&self.log_level).map_err(|err| ConfigError::Invalid {
            field: "log_level",
            message: err.to_string(),
        })?;
        if let Some(level) = &self.cascade_log_level {
            parse_level(level).map_err(|err| ConfigError::Invalid {
                field: "cascade_log_level",
                message: err.to_string(),
            })?;
        }
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid {
                    field: "log_dir",
                    message: format!("must be an absolute path, got `{}`", dir.display()),
                });
            }
        }
        if self.busy_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "busy_timeout_ms",
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn db_options(&self) -> DbOptions {
        DbOptions {
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
        }
    }
}
