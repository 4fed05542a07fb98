//! Snapshot repository and the snapshot dependent store.

use crate::cascade::{CascadeScope, DependentStore, EntityKind};
use crate::model::workspace::{Snapshot, SnapshotId, WorkspaceId};
use crate::repo::{bool_to_int, map_insert_error, parse_bool, parse_uuid, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

const SNAPSHOT_SELECT_SQL: &str = "SELECT id, workspace_id, kind, location, env_name,
        machine_name, is_dev, description, created_at
 FROM snapshots";

pub trait SnapshotRepository {
    fn save_snapshot(&self, snapshot: &Snapshot) -> RepoResult<()>;
    fn get_snapshot(&self, id: SnapshotId) -> RepoResult<Option<Snapshot>>;
    /// Snapshots of one workspace, oldest first.
    fn find_snapshots(&self, workspace_id: WorkspaceId) -> RepoResult<Vec<Snapshot>>;
}

pub struct SqliteSnapshotRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSnapshotRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl SnapshotRepository for SqliteSnapshotRepository<'_> {
    fn save_snapshot(&self, snapshot: &Snapshot) -> RepoResult<()> {
        snapshot.validate()?;
        self.conn
            .execute(
                "INSERT INTO snapshots (
                    id, workspace_id, kind, location, env_name,
                    machine_name, is_dev, description, created_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
                params![
                    snapshot.id.to_string(),
                    snapshot.workspace_id.to_string(),
                    snapshot.kind.as_str(),
                    snapshot.location.as_deref(),
                    snapshot.env_name.as_str(),
                    snapshot.machine_name.as_str(),
                    bool_to_int(snapshot.dev),
                    snapshot.description.as_deref(),
                    snapshot.created_at_ms
                ],
            )
            .map_err(|err| {
                map_insert_error(err, || {
                    format!(
                        "snapshot of machine `{}/{}` already exists for workspace `{}`",
                        snapshot.env_name, snapshot.machine_name, snapshot.workspace_id
                    )
                })
            })?;
        Ok(())
    }

    fn get_snapshot(&self, id: SnapshotId) -> RepoResult<Option<Snapshot>> {
        let row = self
            .conn
            .query_row(
                &format!("{SNAPSHOT_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                read_snapshot_row,
            )
            .optional()?;
        row.map(parse_snapshot_row).transpose()
    }

    fn find_snapshots(&self, workspace_id: WorkspaceId) -> RepoResult<Vec<Snapshot>> {
        load_snapshots(self.conn, workspace_id)
    }
}

/// Removes the snapshots of a workspace being removed.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotStore;

impl DependentStore for SnapshotStore {
    type Entity = Snapshot;

    fn kind(&self) -> EntityKind {
        EntityKind::Snapshot
    }

    fn find_by_owner(&self, scope: &CascadeScope<'_>, owner_id: Uuid) -> RepoResult<Vec<Snapshot>> {
        load_snapshots(scope.connection(), owner_id)
    }

    fn remove_all(&self, scope: &CascadeScope<'_>, owner_id: Uuid) -> RepoResult<usize> {
        let removed = scope.connection().execute(
            "DELETE FROM snapshots WHERE workspace_id = ?1;",
            [owner_id.to_string()],
        )?;
        Ok(removed)
    }
}

struct SnapshotRow {
    id: String,
    workspace_id: String,
    kind: String,
    location: Option<String>,
    env_name: String,
    machine_name: String,
    is_dev: i64,
    description: Option<String>,
    created_at: i64,
}

fn read_snapshot_row(row: &Row<'_>) -> rusqlite::Result<SnapshotRow> {
    Ok(SnapshotRow {
        id: row.get("id")?,
        workspace_id: row.get("workspace_id")?,
        kind: row.get("kind")?,
        location: row.get("location")?,
        env_name: row.get("env_name")?,
        machine_name: row.get("machine_name")?,
        is_dev: row.get("is_dev")?,
        description: row.get("description")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_snapshot_row(row: SnapshotRow) -> RepoResult<Snapshot> {
    Ok(Snapshot {
        id: parse_uuid(&row.id, "snapshots.id")?,
        workspace_id: parse_uuid(&row.workspace_id, "snapshots.workspace_id")?,
        kind: row.kind,
        location: row.location,
        env_name: row.env_name,
        machine_name: row.machine_name,
        dev: parse_bool(row.is_dev, "snapshots.is_dev")?,
        description: row.description,
        created_at_ms: row.created_at,
    })
}

fn load_snapshots(conn: &Connection, workspace_id: WorkspaceId) -> RepoResult<Vec<Snapshot>> {
    let mut stmt = conn.prepare(&format!(
        "{SNAPSHOT_SELECT_SQL} WHERE workspace_id = ?1 ORDER BY created_at ASC, id ASC;"
    ))?;
    let rows = stmt.query_map([workspace_id.to_string()], read_snapshot_row)?;
    let mut snapshots = Vec::new();
    for row in rows {
        snapshots.push(parse_snapshot_row(row?)?);
    }
    Ok(snapshots)
}
