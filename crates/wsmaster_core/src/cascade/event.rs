//! Before-removal events and entity references.

use crate::model::account::AccountId;
use crate::model::user::UserId;
use crate::model::workspace::WorkspaceId;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Every persisted entity kind in the ownership graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Account,
    User,
    Profile,
    Preference,
    SshPair,
    Workspace,
    Snapshot,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::User => "user",
            Self::Profile => "profile",
            Self::Preference => "preference",
            Self::SshPair => "ssh_pair",
            Self::Workspace => "workspace",
            Self::Snapshot => "snapshot",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind + id pair naming one entity in logs and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: Uuid,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: Uuid) -> Self {
        Self { kind, id }
    }
}

impl Display for EntityRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Tag used to register subscribers for one event variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeEventKind {
    BeforeAccountRemoved,
    BeforeUserRemoved,
    BeforeWorkspaceRemoved,
}

impl CascadeEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BeforeAccountRemoved => "before_account_removed",
            Self::BeforeUserRemoved => "before_user_removed",
            Self::BeforeWorkspaceRemoved => "before_workspace_removed",
        }
    }

    /// Kind of the entity about to be removed when this event fires.
    pub fn removed_kind(self) -> EntityKind {
        match self {
            Self::BeforeAccountRemoved => EntityKind::Account,
            Self::BeforeUserRemoved => EntityKind::User,
            Self::BeforeWorkspaceRemoved => EntityKind::Workspace,
        }
    }
}

impl Display for CascadeEventKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Published before an entity's own record is deleted.
///
/// Carries only the identifier; subscribers resolve whatever they need from
/// their own stores inside the removal transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CascadeEvent {
    BeforeAccountRemoved(AccountId),
    BeforeUserRemoved(UserId),
    BeforeWorkspaceRemoved(WorkspaceId),
}

impl CascadeEvent {
    pub fn kind(&self) -> CascadeEventKind {
        match self {
            Self::BeforeAccountRemoved(_) => CascadeEventKind::BeforeAccountRemoved,
            Self::BeforeUserRemoved(_) => CascadeEventKind::BeforeUserRemoved,
            Self::BeforeWorkspaceRemoved(_) => CascadeEventKind::BeforeWorkspaceRemoved,
        }
    }

    pub fn entity_id(&self) -> Uuid {
        match self {
            Self::BeforeAccountRemoved(id)
            | Self::BeforeUserRemoved(id)
            | Self::BeforeWorkspaceRemoved(id) => *id,
        }
    }

    pub fn entity(&self) -> EntityRef {
        EntityRef::new(self.kind().removed_kind(), self.entity_id())
    }
}

#[cfg(test)]
mod tests {
    use super::{CascadeEvent, CascadeEventKind, EntityKind};
    use uuid::Uuid;

    #[test]
    fn event_reports_kind_and_removed_entity() {
        let id = Uuid::new_v4();
        let event = CascadeEvent::BeforeWorkspaceRemoved(id);

        assert_eq!(event.kind(), CascadeEventKind::BeforeWorkspaceRemoved);
        assert_eq!(event.entity_id(), id);
        assert_eq!(event.entity().kind, EntityKind::Workspace);
        assert_eq!(event.entity().to_string(), format!("workspace:{id}"));
    }

    #[test]
    fn event_kind_maps_to_removed_entity_kind() {
        assert_eq!(
            CascadeEventKind::BeforeAccountRemoved.removed_kind(),
            EntityKind::Account
        );
        assert_eq!(
            CascadeEventKind::BeforeUserRemoved.removed_kind(),
            EntityKind::User
        );
    }
}
