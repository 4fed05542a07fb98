//! Workspace manager.
//!
//! # Responsibility
//! - Create workspaces under existing accounts and record their snapshots.
//! - Remove single workspaces through the workspace removal coordinator.
//!
//! # Invariants
//! - A workspace with an active runtime cannot be removed.

use crate::cascade::{EntityKind, EntityRef, EventBus, WorkspaceRemoval};
use crate::model::account::AccountId;
use crate::model::workspace::{Snapshot, Workspace, WorkspaceId};
use crate::repo::account_repo::require_account;
use crate::repo::snapshot_repo::{SnapshotRepository, SqliteSnapshotRepository};
use crate::repo::workspace_repo::{
    NoRuntimes, SqliteWorkspaceRepository, WorkspaceRepository, WorkspaceRuntimes, WorkspaceStore,
};
use crate::service::{ServiceError, ServiceResult};
use log::info;
use rusqlite::Connection;
use std::sync::Arc;

pub struct WorkspaceManager<'conn> {
    conn: &'conn Connection,
    bus: Arc<EventBus>,
    removal: WorkspaceRemoval,
}

impl<'conn> WorkspaceManager<'conn> {
    /// Manager for a process without workspace runtimes.
    pub fn new(conn: &'conn Connection, bus: Arc<EventBus>) -> Self {
        Self::with_runtimes(conn, bus, Arc::new(NoRuntimes))
    }

    pub fn with_runtimes(
        conn: &'conn Connection,
        bus: Arc<EventBus>,
        runtimes: Arc<dyn WorkspaceRuntimes>,
    ) -> Self {
        Self {
            conn,
            bus,
            removal: WorkspaceRemoval::new(WorkspaceStore::new(runtimes)),
        }
    }

    pub fn create_workspace(&self, workspace: &Workspace) -> ServiceResult<Workspace> {
        require_account(self.conn, workspace.account_id)?;
        SqliteWorkspaceRepository::new(self.conn).create_workspace(workspace)?;
        info!(
            "event=workspace_create module=service status=ok id={} account={}",
            workspace.id, workspace.account_id
        );
        Ok(workspace.clone())
    }

    pub fn get_workspace(&self, id: WorkspaceId) -> ServiceResult<Option<Workspace>> {
        Ok(SqliteWorkspaceRepository::new(self.conn).get_workspace(id)?)
    }

    pub fn get_by_account(&self, account_id: AccountId) -> ServiceResult<Vec<Workspace>> {
        Ok(SqliteWorkspaceRepository::new(self.conn).list_by_account(account_id)?)
    }

    pub fn get_by_namespace(&self, namespace: &str) -> ServiceResult<Vec<Workspace>> {
        Ok(SqliteWorkspaceRepository::new(self.conn).list_by_namespace(namespace)?)
    }

    /// Removes one workspace together with its snapshots.
    pub fn remove_workspace(&self, id: WorkspaceId) -> ServiceResult<()> {
        self.removal.remove(self.conn, &self.bus, id)?;
        Ok(())
    }

    pub fn save_snapshot(&self, snapshot: &Snapshot) -> ServiceResult<()> {
        if self.get_workspace(snapshot.workspace_id)?.is_none() {
            return Err(ServiceError::NotFound(EntityRef::new(
                EntityKind::Workspace,
                snapshot.workspace_id,
            )));
        }
        SqliteSnapshotRepository::new(self.conn).save_snapshot(snapshot)?;
        Ok(())
    }

    pub fn get_snapshots(&self, workspace_id: WorkspaceId) -> ServiceResult<Vec<Snapshot>> {
        Ok(SqliteSnapshotRepository::new(self.conn).find_snapshots(workspace_id)?)
    }
}
