//! Built-in subscribers wiring the workspace master entity graph.
//!
//! User removal cleans profile, preferences and ssh pairs. Account removal
//! removes each workspace through the workspace coordinator, which in turn
//! publishes `BeforeWorkspaceRemoved` so snapshots go first.

use super::bus::EventBus;
use super::coordinator::WorkspaceRemoval;
use super::error::{CascadeError, CascadeResult};
use super::event::{CascadeEvent, CascadeEventKind};
use super::scope::CascadeScope;
use super::subscriber::{CascadeSubscriber, RemoveOwnedEntities};
use crate::repo::preference_repo::PreferenceStore;
use crate::repo::profile_repo::ProfileStore;
use crate::repo::snapshot_repo::SnapshotStore;
use crate::repo::ssh_repo::SshPairStore;
use crate::repo::workspace_repo::{WorkspaceRuntimes, WorkspaceStore};
use std::sync::Arc;

pub const REMOVE_PROFILE_BEFORE_USER_REMOVED: &str = "remove_profile_before_user_removed";
pub const REMOVE_PREFERENCES_BEFORE_USER_REMOVED: &str = "remove_preferences_before_user_removed";
pub const REMOVE_SSH_KEYS_BEFORE_USER_REMOVED: &str = "remove_ssh_keys_before_user_removed";
pub const REMOVE_WORKSPACES_BEFORE_ACCOUNT_REMOVED: &str =
    "remove_workspaces_before_account_removed";
pub const REMOVE_SNAPSHOTS_BEFORE_WORKSPACE_REMOVED: &str =
    "remove_snapshots_before_workspace_removed";

/// Removes an account's workspaces, each as a full nested removal.
pub struct RemoveWorkspacesBeforeAccountRemoved {
    runtimes: Arc<dyn WorkspaceRuntimes>,
    removal: WorkspaceRemoval,
}

impl RemoveWorkspacesBeforeAccountRemoved {
    pub fn new(runtimes: Arc<dyn WorkspaceRuntimes>) -> Self {
        let removal = WorkspaceRemoval::new(WorkspaceStore::new(Arc::clone(&runtimes)));
        Self { runtimes, removal }
    }
}

impl CascadeSubscriber for RemoveWorkspacesBeforeAccountRemoved {
    fn name(&self) -> &'static str {
        REMOVE_WORKSPACES_BEFORE_ACCOUNT_REMOVED
    }

    fn on_event(&self, scope: &CascadeScope<'_>, event: &CascadeEvent) -> CascadeResult<()> {
        let workspaces = self.removal.store().find_by_account(scope, event.entity_id())?;
        for workspace in workspaces {
            if self.runtimes.has_runtime(workspace.id) {
                return Err(CascadeError::Subscriber {
                    subscriber: self.name(),
                    message: format!(
                        "workspace `{}` ({}) has an active runtime and cannot be removed",
                        workspace.name, workspace.id
                    ),
                });
            }
            self.removal.remove_in(scope, workspace.id)?;
        }
        Ok(())
    }
}

/// Handles to the default subscriber set, kept so callers can unregister.
pub struct DefaultSubscribers {
    pub profile: Arc<RemoveOwnedEntities<ProfileStore>>,
    pub preferences: Arc<RemoveOwnedEntities<PreferenceStore>>,
    pub ssh_keys: Arc<RemoveOwnedEntities<SshPairStore>>,
    pub workspaces: Arc<RemoveWorkspacesBeforeAccountRemoved>,
    pub snapshots: Arc<RemoveOwnedEntities<SnapshotStore>>,
}

impl DefaultSubscribers {
    pub fn new(runtimes: Arc<dyn WorkspaceRuntimes>) -> Self {
        Self {
            profile: Arc::new(RemoveOwnedEntities::new(
                REMOVE_PROFILE_BEFORE_USER_REMOVED,
                ProfileStore,
            )),
            preferences: Arc::new(RemoveOwnedEntities::new(
                REMOVE_PREFERENCES_BEFORE_USER_REMOVED,
                PreferenceStore,
            )),
            ssh_keys: Arc::new(RemoveOwnedEntities::new(
                REMOVE_SSH_KEYS_BEFORE_USER_REMOVED,
                SshPairStore,
            )),
            workspaces: Arc::new(RemoveWorkspacesBeforeAccountRemoved::new(runtimes)),
            snapshots: Arc::new(RemoveOwnedEntities::new(
                REMOVE_SNAPSHOTS_BEFORE_WORKSPACE_REMOVED,
                SnapshotStore,
            )),
        }
    }

    /// `(event kind, subscriber)` pairs in installation order.
    pub fn registrations(&self) -> Vec<(CascadeEventKind, Arc<dyn CascadeSubscriber>)> {
        vec![
            (
                CascadeEventKind::BeforeUserRemoved,
                self.profile.clone() as Arc<dyn CascadeSubscriber>,
            ),
            (
                CascadeEventKind::BeforeUserRemoved,
                self.preferences.clone() as Arc<dyn CascadeSubscriber>,
            ),
            (
                CascadeEventKind::BeforeUserRemoved,
                self.ssh_keys.clone() as Arc<dyn CascadeSubscriber>,
            ),
            (
                CascadeEventKind::BeforeAccountRemoved,
                self.workspaces.clone() as Arc<dyn CascadeSubscriber>,
            ),
            (
                CascadeEventKind::BeforeWorkspaceRemoved,
                self.snapshots.clone() as Arc<dyn CascadeSubscriber>,
            ),
        ]
    }

    pub fn install(&self, bus: &EventBus) {
        for (kind, subscriber) in self.registrations() {
            bus.subscribe(kind, subscriber);
        }
    }

    pub fn uninstall(&self, bus: &EventBus) {
        for (kind, subscriber) in self.registrations() {
            bus.unsubscribe(kind, subscriber.as_ref());
        }
    }
}
