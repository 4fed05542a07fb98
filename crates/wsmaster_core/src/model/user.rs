//! User root record and its per-user dependents.
//!
//! # Invariants
//! - A profile shares its user's id; there is at most one per user.
//! - Preference keys are unique per user.

use super::{validate_email, validate_name, validate_not_blank, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

pub type UserId = Uuid;

/// Key/value preference map of one user.
pub type Preferences = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

impl User {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name("user name", &self.name)?;
        validate_email(&self.email)
    }
}

/// Free-form profile attributes (first name, company, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: UserId,
    pub attributes: BTreeMap<String, String>,
}

impl Profile {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for name in self.attributes.keys() {
            validate_not_blank("profile attribute name", name)?;
        }
        Ok(())
    }
}

pub(crate) fn validate_preferences(preferences: &Preferences) -> Result<(), ValidationError> {
    for key in preferences.keys() {
        validate_not_blank("preference key", key)?;
    }
    Ok(())
}
