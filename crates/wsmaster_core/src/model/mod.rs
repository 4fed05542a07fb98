//! Domain records for the workspace master entity graph.
//!
//! # Responsibility
//! - Define the persisted shapes of accounts, users and their dependents.
//! - Validate user-supplied names before they reach storage.
//!
//! # Invariants
//! - Identifiers are opaque UUIDs, immutable once assigned.
//! - Account and User are roots; every other record names its owner.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod account;
pub mod ssh;
pub mod user;
pub mod workspace;

static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]{0,99}$").expect("valid name regex"));
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Validation failures for user-supplied record fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Name is empty or contains unsupported characters.
    InvalidName { field: &'static str, value: String },
    /// Email does not look like `local@domain.tld`.
    InvalidEmail(String),
    /// Required text field is blank.
    BlankField(&'static str),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName { field, value } => {
                write!(f, "invalid {field} `{value}`: expected [A-Za-z0-9_.-], max 100 chars")
            }
            Self::InvalidEmail(value) => write!(f, "invalid email `{value}`"),
            Self::BlankField(field) => write!(f, "{field} must not be blank"),
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn validate_name(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if NAME_RE.is_match(value) {
        return Ok(());
    }
    Err(ValidationError::InvalidName {
        field,
        value: value.to_string(),
    })
}

pub(crate) fn validate_email(value: &str) -> Result<(), ValidationError> {
    if EMAIL_RE.is_match(value) {
        return Ok(());
    }
    Err(ValidationError::InvalidEmail(value.to_string()))
}

pub(crate) fn validate_not_blank(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::BlankField(field));
    }
    Ok(())
}
