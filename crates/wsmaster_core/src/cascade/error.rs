//! Cascade error taxonomy.
//!
//! # Invariants
//! - Every error is classified as exactly one `CascadeErrorClass`.
//! - Nested removal failures keep the class of their root cause.

use super::coordinator::RemovalStage;
use super::event::EntityRef;
use crate::db::DbError;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CascadeResult<T> = Result<T, CascadeError>;

/// Coarse error class surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeErrorClass {
    NotFound,
    Conflict,
    StorageFailure,
    SubscriberFailure,
}

/// Failure raised while cascading a removal.
#[derive(Debug)]
pub enum CascadeError {
    /// Referenced entity does not exist.
    NotFound(EntityRef),
    /// Concurrent removal or a business rule forbids the removal.
    Conflict(String),
    /// Underlying persistence fault.
    Storage(RepoError),
    /// A subscriber rejected the cascade.
    Subscriber {
        subscriber: &'static str,
        message: String,
    },
    /// A nested removal triggered by a subscriber failed.
    Nested(Box<RemovalError>),
}

impl CascadeError {
    pub fn class(&self) -> CascadeErrorClass {
        match self {
            Self::NotFound(_) => CascadeErrorClass::NotFound,
            Self::Conflict(_) => CascadeErrorClass::Conflict,
            Self::Storage(_) => CascadeErrorClass::StorageFailure,
            Self::Subscriber { .. } => CascadeErrorClass::SubscriberFailure,
            Self::Nested(err) => err.class(),
        }
    }

    /// Attaches the failing entity and stage.
    pub(crate) fn at(self, entity: EntityRef, stage: RemovalStage) -> RemovalError {
        RemovalError {
            entity,
            stage,
            cause: self,
        }
    }
}

impl Display for CascadeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(entity) => write!(f, "{entity} not found"),
            Self::Conflict(message) => write!(f, "conflict: {message}"),
            Self::Storage(err) => write!(f, "storage failure: {err}"),
            Self::Subscriber {
                subscriber,
                message,
            } => write!(f, "subscriber `{subscriber}` failed: {message}"),
            Self::Nested(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CascadeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            Self::Nested(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<RepoError> for CascadeError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(entity) => Self::NotFound(entity),
            RepoError::Conflict(message) => Self::Conflict(message),
            RepoError::Db(err) if err.is_busy() => {
                Self::Conflict(format!("database is busy with a concurrent write: {err}"))
            }
            other => Self::Storage(other),
        }
    }
}

impl From<DbError> for CascadeError {
    fn from(value: DbError) -> Self {
        RepoError::Db(value).into()
    }
}

impl From<rusqlite::Error> for CascadeError {
    fn from(value: rusqlite::Error) -> Self {
        DbError::Sqlite(value).into()
    }
}

impl From<RemovalError> for CascadeError {
    fn from(value: RemovalError) -> Self {
        Self::Nested(Box::new(value))
    }
}

/// Error returned by a removal coordinator.
///
/// `stage` is the last stage the removal reached before failing; the
/// transaction has been rolled back by the time a caller observes it.
#[derive(Debug)]
pub struct RemovalError {
    pub entity: EntityRef,
    pub stage: RemovalStage,
    pub cause: CascadeError,
}

impl RemovalError {
    pub fn class(&self) -> CascadeErrorClass {
        self.cause.class()
    }

    /// Walks nested removals down to the innermost failing entity.
    pub fn root_cause(&self) -> (&EntityRef, &CascadeError) {
        match &self.cause {
            CascadeError::Nested(inner) => inner.root_cause(),
            cause => (&self.entity, cause),
        }
    }
}

impl Display for RemovalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "failed to remove {} (reached stage {}): {}",
            self.entity, self.stage, self.cause
        )
    }
}

impl Error for RemovalError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.cause)
    }
}
