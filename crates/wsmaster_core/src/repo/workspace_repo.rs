//! Workspace repository and the workspace store.
//!
//! # Responsibility
//! - Persist workspaces under their owning account.
//! - Act as root store for workspace removal and resolve the workspaces an
//!   account removal has to remove one by one.
//!
//! # Invariants
//! - A workspace with an active runtime is never removed.
//! - Snapshots are the only dependents of a workspace.

use crate::cascade::{
    CascadeError, CascadeEvent, CascadeResult, CascadeScope, EntityKind, RootStore,
};
use crate::model::account::AccountId;
use crate::model::workspace::{Workspace, WorkspaceId};
use crate::repo::{
    bool_to_int, count_rows, map_insert_error, parse_bool, parse_uuid, RepoResult,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::Arc;
use uuid::Uuid;

const WORKSPACE_SELECT_SQL: &str =
    "SELECT w.id, w.account_id, w.name, w.is_temporary FROM workspaces w";

/// Answers whether a workspace currently has a running runtime.
pub trait WorkspaceRuntimes: Send + Sync {
    fn has_runtime(&self, workspace_id: WorkspaceId) -> bool;
}

/// Runtime registry for processes that never start workspaces.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRuntimes;

impl WorkspaceRuntimes for NoRuntimes {
    fn has_runtime(&self, _workspace_id: WorkspaceId) -> bool {
        false
    }
}

pub trait WorkspaceRepository {
    fn create_workspace(&self, workspace: &Workspace) -> RepoResult<()>;
    fn get_workspace(&self, id: WorkspaceId) -> RepoResult<Option<Workspace>>;
    fn list_by_account(&self, account_id: AccountId) -> RepoResult<Vec<Workspace>>;
    /// Workspaces of the account named `namespace`.
    fn list_by_namespace(&self, namespace: &str) -> RepoResult<Vec<Workspace>>;
}

pub struct SqliteWorkspaceRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteWorkspaceRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl WorkspaceRepository for SqliteWorkspaceRepository<'_> {
    fn create_workspace(&self, workspace: &Workspace) -> RepoResult<()> {
        workspace.validate()?;
        self.conn
            .execute(
                "INSERT INTO workspaces (id, account_id, name, is_temporary)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    workspace.id.to_string(),
                    workspace.account_id.to_string(),
                    workspace.name.as_str(),
                    bool_to_int(workspace.temporary)
                ],
            )
            .map_err(|err| {
                map_insert_error(err, || {
                    format!(
                        "workspace `{}` already exists in account `{}`",
                        workspace.name, workspace.account_id
                    )
                })
            })?;
        Ok(())
    }

    fn get_workspace(&self, id: WorkspaceId) -> RepoResult<Option<Workspace>> {
        let row = self
            .conn
            .query_row(
                &format!("{WORKSPACE_SELECT_SQL} WHERE w.id = ?1;"),
                [id.to_string()],
                read_workspace_row,
            )
            .optional()?;
        row.map(parse_workspace_row).transpose()
    }

    fn list_by_account(&self, account_id: AccountId) -> RepoResult<Vec<Workspace>> {
        load_workspaces(self.conn, account_id)
    }

    fn list_by_namespace(&self, namespace: &str) -> RepoResult<Vec<Workspace>> {
        let mut stmt = self.conn.prepare(&format!(
            "{WORKSPACE_SELECT_SQL}
             JOIN accounts a ON a.id = w.account_id
             WHERE a.name = ?1
             ORDER BY w.name ASC;"
        ))?;
        let rows = stmt.query_map([namespace], read_workspace_row)?;
        collect_workspaces(rows)
    }
}

/// Workspace store; consults `runtimes` before allowing removal.
#[derive(Clone)]
pub struct WorkspaceStore {
    runtimes: Arc<dyn WorkspaceRuntimes>,
}

impl WorkspaceStore {
    pub fn new(runtimes: Arc<dyn WorkspaceRuntimes>) -> Self {
        Self { runtimes }
    }

    /// Workspaces of `account_id` as seen by the removal transaction.
    ///
    /// There is no bulk delete counterpart: each workspace must go through
    /// its own removal so `BeforeWorkspaceRemoved` reaches its subscribers.
    pub fn find_by_account(
        &self,
        scope: &CascadeScope<'_>,
        account_id: AccountId,
    ) -> RepoResult<Vec<Workspace>> {
        load_workspaces(scope.connection(), account_id)
    }
}

impl Default for WorkspaceStore {
    fn default() -> Self {
        Self::new(Arc::new(NoRuntimes))
    }
}

impl RootStore for WorkspaceStore {
    fn kind(&self) -> EntityKind {
        EntityKind::Workspace
    }

    fn before_removed(&self, id: Uuid) -> CascadeEvent {
        CascadeEvent::BeforeWorkspaceRemoved(id)
    }

    fn exists(&self, conn: &Connection, id: Uuid) -> RepoResult<bool> {
        Ok(count_rows(conn, "workspaces", "id", id)? > 0)
    }

    fn count_dependents(&self, conn: &Connection, id: Uuid) -> RepoResult<usize> {
        count_rows(conn, "snapshots", "workspace_id", id)
    }

    fn check_removable(&self, _conn: &Connection, id: Uuid) -> CascadeResult<()> {
        if self.runtimes.has_runtime(id) {
            return Err(CascadeError::Conflict(format!(
                "workspace `{id}` has an active runtime"
            )));
        }
        Ok(())
    }

    fn delete_record(&self, scope: &CascadeScope<'_>, id: Uuid) -> RepoResult<usize> {
        let removed = scope
            .connection()
            .execute("DELETE FROM workspaces WHERE id = ?1;", [id.to_string()])?;
        Ok(removed)
    }
}

type WorkspaceRow = (String, String, String, i64);

fn read_workspace_row(row: &Row<'_>) -> rusqlite::Result<WorkspaceRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn parse_workspace_row((id, account_id, name, temporary): WorkspaceRow) -> RepoResult<Workspace> {
    Ok(Workspace {
        id: parse_uuid(&id, "workspaces.id")?,
        account_id: parse_uuid(&account_id, "workspaces.account_id")?,
        name,
        temporary: parse_bool(temporary, "workspaces.is_temporary")?,
    })
}

fn collect_workspaces(
    rows: impl Iterator<Item = rusqlite::Result<WorkspaceRow>>,
) -> RepoResult<Vec<Workspace>> {
    let mut workspaces = Vec::new();
    for row in rows {
        workspaces.push(parse_workspace_row(row?)?);
    }
    Ok(workspaces)
}

fn load_workspaces(conn: &Connection, account_id: AccountId) -> RepoResult<Vec<Workspace>> {
    let mut stmt = conn.prepare(&format!(
        "{WORKSPACE_SELECT_SQL} WHERE w.account_id = ?1 ORDER BY w.name ASC;"
    ))?;
    let rows = stmt.query_map([account_id.to_string()], read_workspace_row)?;
    collect_workspaces(rows)
}
