//! Repository layer: CRUD repositories and cascade stores per entity kind.
//!
//! # Responsibility
//! - `Sqlite*Repository` types provide create/read paths over a connection.
//! - `*Store` types implement the cascade contracts (`RootStore`,
//!   `DependentStore`) and are the only code allowed to delete rows.
//!
//! # Invariants
//! - Deletion APIs take a `CascadeScope`, so rows can only be removed inside
//!   a removal coordinator's transaction.
//! - Repository APIs return semantic errors (`NotFound`, `Conflict`) in
//!   addition to DB transport errors.

use crate::cascade::EntityRef;
use crate::db::DbError;
use crate::model::ValidationError;
use rusqlite::ffi;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod account_repo;
pub mod preference_repo;
pub mod profile_repo;
pub mod snapshot_repo;
pub mod ssh_repo;
pub mod user_repo;
pub mod workspace_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by all entity kinds.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    NotFound(EntityRef),
    /// Unique key already taken.
    Conflict(String),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(entity) => write!(f, "{entity} not found"),
            Self::Conflict(message) => write!(f, "conflict: {message}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) => None,
            Self::Conflict(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Maps insert failures, turning unique/primary key violations into `Conflict`.
pub(crate) fn map_insert_error(err: rusqlite::Error, describe: impl FnOnce() -> String) -> RepoError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &err {
        if matches!(
            failure.extended_code,
            ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        ) {
            return RepoError::Conflict(describe());
        }
    }
    err.into()
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn parse_bool(value: i64, column: &'static str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

/// Counts rows of `table` whose `column` equals `id`.
pub(crate) fn count_rows(
    conn: &rusqlite::Connection,
    table: &str,
    column: &str,
    id: Uuid,
) -> RepoResult<usize> {
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {table} WHERE {column} = ?1;"),
        [id.to_string()],
        |row| row.get(0),
    )?;
    usize::try_from(count)
        .map_err(|_| RepoError::InvalidData(format!("negative row count in {table}")))
}
