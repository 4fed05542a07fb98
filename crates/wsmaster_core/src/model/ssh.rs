//! SSH key pair record owned by a user.

use super::user::UserId;
use super::{validate_not_blank, ValidationError};
use serde::{Deserialize, Serialize};

/// One key pair, unique per `(owner, service, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshPair {
    pub owner: UserId,
    /// Consumer of the key, e.g. `vcs` or `machine`.
    pub service: String,
    pub name: String,
    pub public_key: Option<String>,
    pub private_key: Option<String>,
}

impl SshPair {
    pub fn new(owner: UserId, service: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner,
            service: service.into(),
            name: name.into(),
            public_key: None,
            private_key: None,
        }
    }

    pub fn with_keys(mut self, public_key: impl Into<String>, private_key: impl Into<String>) -> Self {
        self.public_key = Some(public_key.into());
        self.private_key = Some(private_key.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_not_blank("ssh service", &self.service)?;
        validate_not_blank("ssh pair name", &self.name)
    }
}
