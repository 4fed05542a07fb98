//! SSH pair repository and the ssh dependent store.

use crate::cascade::{CascadeScope, DependentStore, EntityKind};
use crate::model::ssh::SshPair;
use crate::model::user::UserId;
use crate::repo::{map_insert_error, parse_uuid, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

const SSH_SELECT_SQL: &str =
    "SELECT owner, service, name, public_key, private_key FROM ssh_pairs";

pub trait SshPairRepository {
    fn create_pair(&self, pair: &SshPair) -> RepoResult<()>;
    fn get_pair(&self, owner: UserId, service: &str, name: &str) -> RepoResult<Option<SshPair>>;
    /// Pairs of `owner`, optionally restricted to one service.
    fn get_pairs(&self, owner: UserId, service: Option<&str>) -> RepoResult<Vec<SshPair>>;
}

pub struct SqliteSshPairRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSshPairRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl SshPairRepository for SqliteSshPairRepository<'_> {
    fn create_pair(&self, pair: &SshPair) -> RepoResult<()> {
        pair.validate()?;
        self.conn
            .execute(
                "INSERT INTO ssh_pairs (owner, service, name, public_key, private_key)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    pair.owner.to_string(),
                    pair.service.as_str(),
                    pair.name.as_str(),
                    pair.public_key.as_deref(),
                    pair.private_key.as_deref()
                ],
            )
            .map_err(|err| {
                map_insert_error(err, || {
                    format!(
                        "ssh pair `{}/{}` of user `{}` already exists",
                        pair.service, pair.name, pair.owner
                    )
                })
            })?;
        Ok(())
    }

    fn get_pair(&self, owner: UserId, service: &str, name: &str) -> RepoResult<Option<SshPair>> {
        let row = self
            .conn
            .query_row(
                &format!("{SSH_SELECT_SQL} WHERE owner = ?1 AND service = ?2 AND name = ?3;"),
                params![owner.to_string(), service, name],
                read_ssh_row,
            )
            .optional()?;
        row.map(parse_ssh_row).transpose()
    }

    fn get_pairs(&self, owner: UserId, service: Option<&str>) -> RepoResult<Vec<SshPair>> {
        let pairs = load_pairs(self.conn, owner)?;
        Ok(match service {
            Some(service) => pairs.into_iter().filter(|p| p.service == service).collect(),
            None => pairs,
        })
    }
}

/// Removes the ssh pairs of a user being removed.
#[derive(Debug, Clone, Copy, Default)]
pub struct SshPairStore;

impl DependentStore for SshPairStore {
    type Entity = SshPair;

    fn kind(&self) -> EntityKind {
        EntityKind::SshPair
    }

    fn find_by_owner(&self, scope: &CascadeScope<'_>, owner_id: Uuid) -> RepoResult<Vec<SshPair>> {
        load_pairs(scope.connection(), owner_id)
    }

    fn remove_all(&self, scope: &CascadeScope<'_>, owner_id: Uuid) -> RepoResult<usize> {
        let removed = scope
            .connection()
            .execute("DELETE FROM ssh_pairs WHERE owner = ?1;", [owner_id.to_string()])?;
        Ok(removed)
    }
}

type SshRow = (String, String, String, Option<String>, Option<String>);

fn read_ssh_row(row: &Row<'_>) -> rusqlite::Result<SshRow> {
    Ok((
        row.get("owner")?,
        row.get("service")?,
        row.get("name")?,
        row.get("public_key")?,
        row.get("private_key")?,
    ))
}

fn parse_ssh_row((owner, service, name, public_key, private_key): SshRow) -> RepoResult<SshPair> {
    Ok(SshPair {
        owner: parse_uuid(&owner, "ssh_pairs.owner")?,
        service,
        name,
        public_key,
        private_key,
    })
}

fn load_pairs(conn: &Connection, owner: UserId) -> RepoResult<Vec<SshPair>> {
    let mut stmt = conn.prepare(&format!(
        "{SSH_SELECT_SQL} WHERE owner = ?1 ORDER BY service ASC, name ASC;"
    ))?;
    let rows = stmt.query_map([owner.to_string()], read_ssh_row)?;
    let mut pairs = Vec::new();
    for row in rows {
        pairs.push(parse_ssh_row(row?)?);
    }
    Ok(pairs)
}
