//! SQLite storage bootstrap and schema migration entry points.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the workspace master core.
//! - Apply schema migrations in deterministic order.
//! - Classify SQLite failures for the cascade error taxonomy.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Every returned connection enforces foreign keys; dependents are never
//!   declared with `ON DELETE CASCADE`.

use rusqlite::ErrorCode;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

/// Default time a connection waits on a locked database before failing.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub type DbResult<T> = Result<T, DbError>;

/// Connection bootstrap options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbOptions {
    /// How long a writer waits for a competing transaction to finish.
    pub busy_timeout: Duration,
}

impl Default for DbOptions {
    fn default() -> Self {
        Self {
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }
}

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl DbError {
    /// Returns true when the failure was caused by a competing writer.
    pub fn is_busy(&self) -> bool {
        matches!(
            self.sqlite_code(),
            Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
        )
    }

    /// Returns true for constraint violations (unique, foreign key, check).
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self.sqlite_code(), Some(ErrorCode::ConstraintViolation))
    }

    fn sqlite_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Sqlite(err) => err.sqlite_error_code(),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
