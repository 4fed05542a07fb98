//! Manager services over the repositories and removal coordinators.
//!
//! # Responsibility
//! - Group multi-row writes (user + profile) into one transaction.
//! - Route every removal through the matching removal coordinator.
//!
//! # Invariants
//! - Managers never delete rows directly.

use crate::cascade::{EntityRef, RemovalError};
use crate::db::DbError;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod account_service;
pub mod user_service;
pub mod workspace_service;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Manager-level error.
#[derive(Debug)]
pub enum ServiceError {
    /// Referenced entity does not exist.
    NotFound(EntityRef),
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Cascade removal failed and was rolled back.
    Removal(RemovalError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(entity) => write!(f, "{entity} not found"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Removal(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotFound(_) => None,
            Self::Repo(err) => Some(err),
            Self::Removal(err) => Some(err),
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(entity) => Self::NotFound(entity),
            other => Self::Repo(other),
        }
    }
}

impl From<DbError> for ServiceError {
    fn from(value: DbError) -> Self {
        Self::Repo(RepoError::Db(value))
    }
}

impl From<rusqlite::Error> for ServiceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(RepoError::from(value))
    }
}

impl From<RemovalError> for ServiceError {
    fn from(value: RemovalError) -> Self {
        Self::Removal(value)
    }
}
