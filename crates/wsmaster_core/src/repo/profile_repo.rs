//! Profile repository and the profile dependent store.
//!
//! A profile row has no columns besides its user id; attributes live in
//! `profile_attributes` and are removed together with the profile.

use crate::cascade::{CascadeScope, DependentStore, EntityKind};
use crate::model::user::{Profile, UserId};
use crate::repo::{map_insert_error, RepoResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use uuid::Uuid;

pub trait ProfileRepository {
    /// Inserts the profile row and its attributes.
    ///
    /// Callers should run this inside a transaction so a failed attribute
    /// insert does not leave a partial profile behind.
    fn create_profile(&self, profile: &Profile) -> RepoResult<()>;
    fn get_profile(&self, user_id: UserId) -> RepoResult<Option<Profile>>;
}

pub struct SqliteProfileRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProfileRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ProfileRepository for SqliteProfileRepository<'_> {
    fn create_profile(&self, profile: &Profile) -> RepoResult<()> {
        profile.validate()?;
        let user_id = profile.user_id.to_string();
        self.conn
            .execute("INSERT INTO profiles (user_id) VALUES (?1);", [&user_id])
            .map_err(|err| {
                map_insert_error(err, || {
                    format!("profile of user `{}` already exists", profile.user_id)
                })
            })?;

        let mut stmt = self.conn.prepare(
            "INSERT INTO profile_attributes (user_id, name, value) VALUES (?1, ?2, ?3);",
        )?;
        for (name, value) in &profile.attributes {
            stmt.execute(params![user_id, name, value])?;
        }
        Ok(())
    }

    fn get_profile(&self, user_id: UserId) -> RepoResult<Option<Profile>> {
        load_profile(self.conn, user_id)
    }
}

/// Removes the profile of a user being removed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfileStore;

impl DependentStore for ProfileStore {
    type Entity = Profile;

    fn kind(&self) -> EntityKind {
        EntityKind::Profile
    }

    fn find_by_owner(&self, scope: &CascadeScope<'_>, owner_id: Uuid) -> RepoResult<Vec<Profile>> {
        Ok(load_profile(scope.connection(), owner_id)?.into_iter().collect())
    }

    fn remove_all(&self, scope: &CascadeScope<'_>, owner_id: Uuid) -> RepoResult<usize> {
        let conn = scope.connection();
        let owner = owner_id.to_string();
        conn.execute("DELETE FROM profile_attributes WHERE user_id = ?1;", [&owner])?;
        let removed = conn.execute("DELETE FROM profiles WHERE user_id = ?1;", [&owner])?;
        Ok(removed)
    }
}

fn load_profile(conn: &Connection, user_id: UserId) -> RepoResult<Option<Profile>> {
    let id = user_id.to_string();
    let exists = conn
        .query_row("SELECT 1 FROM profiles WHERE user_id = ?1;", [&id], |_| Ok(()))
        .optional()?
        .is_some();
    if !exists {
        return Ok(None);
    }

    let mut stmt = conn.prepare(
        "SELECT name, value FROM profile_attributes WHERE user_id = ?1 ORDER BY name ASC;",
    )?;
    let rows = stmt.query_map([&id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    let attributes = rows.collect::<Result<BTreeMap<_, _>, _>>()?;
    Ok(Some(Profile {
        user_id,
        attributes,
    }))
}
