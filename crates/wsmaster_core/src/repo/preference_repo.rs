//! Preference repository and the preference dependent store.

use crate::cascade::{CascadeScope, DependentStore, EntityKind};
use crate::model::user::{validate_preferences, Preferences, UserId};
use crate::repo::RepoResult;
use rusqlite::{params, Connection};
use uuid::Uuid;

pub trait PreferenceRepository {
    /// Replaces the whole preference map of `user_id`.
    fn set_preferences(&self, user_id: UserId, preferences: &Preferences) -> RepoResult<()>;
    fn get_preferences(&self, user_id: UserId) -> RepoResult<Preferences>;
}

pub struct SqlitePreferenceRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePreferenceRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl PreferenceRepository for SqlitePreferenceRepository<'_> {
    fn set_preferences(&self, user_id: UserId, preferences: &Preferences) -> RepoResult<()> {
        validate_preferences(preferences)?;
        let owner = user_id.to_string();
        self.conn
            .execute("DELETE FROM preferences WHERE user_id = ?1;", [&owner])?;
        let mut stmt = self.conn.prepare(
            "INSERT INTO preferences (user_id, pref_key, pref_value) VALUES (?1, ?2, ?3);",
        )?;
        for (key, value) in preferences {
            stmt.execute(params![owner, key, value])?;
        }
        Ok(())
    }

    fn get_preferences(&self, user_id: UserId) -> RepoResult<Preferences> {
        Ok(load_preferences(self.conn, user_id)?.into_iter().collect())
    }
}

/// Removes the preferences of a user being removed.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreferenceStore;

impl DependentStore for PreferenceStore {
    /// `(key, value)` entries.
    type Entity = (String, String);

    fn kind(&self) -> EntityKind {
        EntityKind::Preference
    }

    fn find_by_owner(
        &self,
        scope: &CascadeScope<'_>,
        owner_id: Uuid,
    ) -> RepoResult<Vec<(String, String)>> {
        load_preferences(scope.connection(), owner_id)
    }

    fn remove_all(&self, scope: &CascadeScope<'_>, owner_id: Uuid) -> RepoResult<usize> {
        let removed = scope.connection().execute(
            "DELETE FROM preferences WHERE user_id = ?1;",
            [owner_id.to_string()],
        )?;
        Ok(removed)
    }
}

fn load_preferences(conn: &Connection, user_id: UserId) -> RepoResult<Vec<(String, String)>> {
    let mut stmt = conn.prepare(
        "SELECT pref_key, pref_value FROM preferences WHERE user_id = ?1 ORDER BY pref_key ASC;",
    )?;
    let rows = stmt.query_map([user_id.to_string()], |row| Ok((row.get(0)?, row.get(1)?)))?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}
