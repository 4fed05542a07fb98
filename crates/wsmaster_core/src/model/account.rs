//! Account root record.

use super::{validate_name, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type AccountId = Uuid;

/// Account flavour. Personal accounts mirror a single user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Personal,
    Organizational,
}

impl AccountKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Personal => "personal",
            Self::Organizational => "organizational",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "personal" => Some(Self::Personal),
            "organizational" => Some(Self::Organizational),
            _ => None,
        }
    }
}

/// Root of the workspace ownership tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// Unique across accounts; used as the workspace namespace.
    pub name: String,
    pub kind: AccountKind,
}

impl Account {
    pub fn new(name: impl Into<String>, kind: AccountKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
        }
    }

    pub fn personal(name: impl Into<String>) -> Self {
        Self::new(name, AccountKind::Personal)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name("account name", &self.name)
    }
}
