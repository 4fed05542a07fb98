//! Workspace and machine snapshot records.
//!
//! # Invariants
//! - Workspace names are unique within one account.
//! - A snapshot is unique per `(workspace, env_name, machine_name)`.

use super::account::AccountId;
use super::{validate_name, validate_not_blank, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type WorkspaceId = Uuid;
pub type SnapshotId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub account_id: AccountId,
    pub name: String,
    /// Temporary workspaces are created for one-off sessions.
    pub temporary: bool,
}

impl Workspace {
    pub fn new(account_id: AccountId, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            name: name.into(),
            temporary: false,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name("workspace name", &self.name)
    }
}

/// Saved machine state of one workspace environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: SnapshotId,
    pub workspace_id: WorkspaceId,
    /// Machine implementation type, e.g. `docker`.
    #[serde(rename = "type")]
    pub kind: String,
    pub location: Option<String>,
    pub env_name: String,
    pub machine_name: String,
    pub dev: bool,
    pub description: Option<String>,
    /// Unix epoch milliseconds.
    pub created_at_ms: i64,
}

impl Snapshot {
    pub fn new(
        workspace_id: WorkspaceId,
        env_name: impl Into<String>,
        machine_name: impl Into<String>,
        created_at_ms: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            workspace_id,
            kind: "docker".to_string(),
            location: None,
            env_name: env_name.into(),
            machine_name: machine_name.into(),
            dev: false,
            description: None,
            created_at_ms,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_not_blank("snapshot type", &self.kind)?;
        validate_not_blank("snapshot env name", &self.env_name)?;
        validate_not_blank("snapshot machine name", &self.machine_name)
    }
}
