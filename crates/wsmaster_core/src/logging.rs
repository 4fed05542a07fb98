//! Process logging for the workspace master.
//!
//! # Responsibility
//! - Turn the logging fields of `CoreConfig` into `LogSettings`.
//! - Run at most one rolling file logger per process and record panics as
//!   one-line `panic_captured` events.
//!
//! # Event vocabulary
//! Every line reads `event=<name> module=<module> status=<start|ok|error>`
//! followed by `key=value` pairs:
//! - `db`: `db_open`, `db_migrate`
//! - `config`: `config_load`
//! - `cascade`: `cascade_remove` (with `entity`, `id`, `stage`,
//!   `duration_ms`), `cascade_remove_nested`, `cascade_stage`,
//!   `cascade_publish`, `cascade_subscriber`, `cascade_dependents_removed`,
//!   `cascade_rollback`, `cascade_subscribe`, `cascade_unsubscribe`
//! - `service`: `account_create`, `user_create`, `workspace_create`
//! - `logging`: `logging_start`, `panic_captured`
//! - `cli`: `cli_run`
//!
//! `cascade_log_level` raises or lowers `wsmaster_core::cascade` alone, so
//! stage transitions can be traced without debug output from everything else.
//!
//! # Invariants
//! - Starting again with equal settings is a no-op; different settings are
//!   rejected with `AlreadyActive`.
//! - Nothing in this module panics.

use crate::config::CoreConfig;
use flexi_logger::{
    Cleanup, Criterion, FileSpec, FlexiLoggerError, LogSpecification, Logger, LoggerHandle,
    Naming, WriteMode,
};
use log::{error, info, LevelFilter};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::panic::PanicHookInfo;
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "wsmaster";
const CASCADE_MODULE: &str = "wsmaster_core::cascade";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;
const MAX_PANIC_PAYLOAD_CHARS: usize = 160;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();

struct ActiveLogger {
    settings: LogSettings,
    _handle: LoggerHandle,
}

#[derive(Debug)]
pub enum LoggingError {
    UnknownLevel(String),
    RelativeDir(PathBuf),
    CreateDir {
        dir: PathBuf,
        source: std::io::Error,
    },
    Backend(FlexiLoggerError),
    /// A logger with other settings already runs in this process.
    AlreadyActive {
        active: LogSettings,
        requested: LogSettings,
    },
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownLevel(level) => write!(
                f,
                "unsupported log level `{level}`; expected trace|debug|info|warn|error"
            ),
            Self::RelativeDir(dir) => {
                write!(f, "log_dir must be an absolute path, got `{}`", dir.display())
            }
            Self::CreateDir { dir, source } => {
                write!(f, "failed to create log directory `{}`: {source}", dir.display())
            }
            Self::Backend(err) => write!(f, "failed to start logger: {err}"),
            Self::AlreadyActive { active, requested } => write!(
                f,
                "logging already runs with {active}; refusing to switch to {requested}"
            ),
        }
    }
}

impl Error for LoggingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDir { source, .. } => Some(source),
            Self::Backend(err) => Some(err),
            _ => None,
        }
    }
}

impl From<FlexiLoggerError> for LoggingError {
    fn from(value: FlexiLoggerError) -> Self {
        Self::Backend(value)
    }
}

/// Validated logger settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: LevelFilter,
    /// Overrides `level` for the cascade modules only.
    pub cascade_level: Option<LevelFilter>,
    pub dir: PathBuf,
}

impl LogSettings {
    /// # Errors
    /// `UnknownLevel` or `RelativeDir`.
    pub fn new(level: &str, dir: impl Into<PathBuf>) -> Result<Self, LoggingError> {
        let dir = dir.into();
        if !dir.is_absolute() {
            return Err(LoggingError::RelativeDir(dir));
        }
        Ok(Self {
            level: parse_level(level)?,
            cascade_level: None,
            dir,
        })
    }

    pub fn with_cascade_level(mut self, level: LevelFilter) -> Self {
        self.cascade_level = Some(level);
        self
    }

    /// Settings for `config`, or `None` when it leaves file logging off.
    pub fn from_config(config: &CoreConfig) -> Result<Option<Self>, LoggingError> {
        let Some(dir) = config.log_dir.as_deref() else {
            return Ok(None);
        };
        let mut settings = Self::new(&config.log_level, dir)?;
        if let Some(level) = config.cascade_log_level.as_deref() {
            settings = settings.with_cascade_level(parse_level(level)?);
        }
        Ok(Some(settings))
    }

    fn log_spec(&self) -> LogSpecification {
        let mut builder = LogSpecification::builder();
        builder.default(self.level);
        if let Some(level) = self.cascade_level {
            builder.module(CASCADE_MODULE, level);
        }
        builder.build()
    }
}

impl Display for LogSettings {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "level={} ", self.level)?;
        if let Some(level) = self.cascade_level {
            write!(f, "cascade_level={level} ")?;
        }
        write!(f, "dir={}", self.dir.display())
    }
}

/// Parses a case-insensitive level name; `warning` is accepted for `warn`.
pub fn parse_level(level: &str) -> Result<LevelFilter, LoggingError> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok(LevelFilter::Trace),
        "debug" => Ok(LevelFilter::Debug),
        "info" => Ok(LevelFilter::Info),
        "warn" | "warning" => Ok(LevelFilter::Warn),
        "error" => Ok(LevelFilter::Error),
        _ => Err(LoggingError::UnknownLevel(level.trim().to_string())),
    }
}

/// Starts the process logger.
///
/// # Errors
/// `CreateDir` or `Backend` when the logger cannot start, `AlreadyActive`
/// when it already runs with different settings.
pub fn init_logging(settings: &LogSettings) -> Result<(), LoggingError> {
    let active = ACTIVE.get_or_try_init(|| start(settings))?;
    if active.settings != *settings {
        return Err(LoggingError::AlreadyActive {
            active: active.settings.clone(),
            requested: settings.clone(),
        });
    }
    Ok(())
}

/// Starts file logging when `config.log_dir` is set.
///
/// Returns `Ok(false)` when the config leaves file logging off.
pub fn init_from_config(config: &CoreConfig) -> Result<bool, LoggingError> {
    match LogSettings::from_config(config)? {
        Some(settings) => init_logging(&settings).map(|()| true),
        None => Ok(false),
    }
}

/// Settings of the running logger, if any.
pub fn logging_status() -> Option<LogSettings> {
    ACTIVE.get().map(|active| active.settings.clone())
}

/// `debug` for debug builds, `info` otherwise.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start(settings: &LogSettings) -> Result<ActiveLogger, LoggingError> {
    create_dir(&settings.dir)?;
    let handle = Logger::with(settings.log_spec())
        .log_to_file(
            FileSpec::default()
                .directory(settings.dir.as_path())
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(MAX_LOG_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()?;

    install_panic_hook();
    info!(
        "event=logging_start module=logging status=ok version={} {}",
        env!("CARGO_PKG_VERSION"),
        settings
    );
    Ok(ActiveLogger {
        settings: settings.clone(),
        _handle: handle,
    })
}

fn create_dir(dir: &Path) -> Result<(), LoggingError> {
    std::fs::create_dir_all(dir).map_err(|source| LoggingError::CreateDir {
        dir: dir.to_path_buf(),
        source,
    })
}

/// Runs once, from the logger start.
fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        error!(
            "event=panic_captured module=logging status=error location={} payload={}",
            location,
            panic_summary(info)
        );
        previous(info);
    }));
}

fn panic_summary(info: &PanicHookInfo<'_>) -> String {
    let payload = info.payload();
    let text = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload");
    one_line(text, MAX_PANIC_PAYLOAD_CHARS)
}

/// Flattens `value` to one line of at most `max_chars` characters.
fn one_line(value: &str, max_chars: usize) -> String {
    let flat = value.replace(['\n', '\r'], " ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut cut: String = flat.chars().take(max_chars).collect();
    cut.push_str("...");
    cut
}
