//! User manager.
//!
//! # Invariants
//! - Every user is created together with its profile, in one transaction.

use crate::cascade::{EntityKind, EntityRef, EventBus, UserRemoval};
use crate::model::ssh::SshPair;
use crate::model::user::{Preferences, Profile, User, UserId};
use crate::repo::preference_repo::{PreferenceRepository, SqlitePreferenceRepository};
use crate::repo::profile_repo::{ProfileRepository, SqliteProfileRepository};
use crate::repo::ssh_repo::{SqliteSshPairRepository, SshPairRepository};
use crate::repo::user_repo::{SqliteUserRepository, UserRepository, UserStore};
use crate::service::{ServiceError, ServiceResult};
use log::info;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct UserManager<'conn> {
    conn: &'conn Connection,
    bus: Arc<EventBus>,
    removal: UserRemoval,
}

impl<'conn> UserManager<'conn> {
    pub fn new(conn: &'conn Connection, bus: Arc<EventBus>) -> Self {
        Self {
            conn,
            bus,
            removal: UserRemoval::new(UserStore),
        }
    }

    /// Creates `user` and its profile with the given attributes.
    pub fn create(
        &self,
        user: &User,
        profile_attributes: BTreeMap<String, String>,
    ) -> ServiceResult<User> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        SqliteUserRepository::new(&tx).create_user(user)?;
        let profile = Profile {
            user_id: user.id,
            attributes: profile_attributes,
        };
        SqliteProfileRepository::new(&tx).create_profile(&profile)?;
        tx.commit()?;

        info!(
            "event=user_create module=service status=ok id={} attributes={}",
            user.id,
            profile.attributes.len()
        );
        Ok(user.clone())
    }

    pub fn get_by_id(&self, id: UserId) -> ServiceResult<Option<User>> {
        Ok(SqliteUserRepository::new(self.conn).get_user(id)?)
    }

    pub fn get_by_name(&self, name: &str) -> ServiceResult<Option<User>> {
        Ok(SqliteUserRepository::new(self.conn).get_user_by_name(name)?)
    }

    pub fn get_by_email(&self, email: &str) -> ServiceResult<Option<User>> {
        Ok(SqliteUserRepository::new(self.conn).get_user_by_email(email)?)
    }

    pub fn get_profile(&self, user_id: UserId) -> ServiceResult<Option<Profile>> {
        Ok(SqliteProfileRepository::new(self.conn).get_profile(user_id)?)
    }

    /// Replaces all preferences of an existing user.
    pub fn update_preferences(
        &self,
        user_id: UserId,
        preferences: &Preferences,
    ) -> ServiceResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        self.require_user(&tx, user_id)?;
        SqlitePreferenceRepository::new(&tx).set_preferences(user_id, preferences)?;
        tx.commit()?;
        Ok(())
    }

    pub fn get_preferences(&self, user_id: UserId) -> ServiceResult<Preferences> {
        Ok(SqlitePreferenceRepository::new(self.conn).get_preferences(user_id)?)
    }

    pub fn create_ssh_pair(&self, pair: &SshPair) -> ServiceResult<()> {
        self.require_user(self.conn, pair.owner)?;
        SqliteSshPairRepository::new(self.conn).create_pair(pair)?;
        Ok(())
    }

    pub fn get_ssh_pairs(
        &self,
        owner: UserId,
        service: Option<&str>,
    ) -> ServiceResult<Vec<SshPair>> {
        Ok(SqliteSshPairRepository::new(self.conn).get_pairs(owner, service)?)
    }

    /// Removes the user with its profile, preferences and ssh pairs.
    pub fn remove(&self, id: UserId) -> ServiceResult<()> {
        self.removal.remove(self.conn, &self.bus, id)?;
        Ok(())
    }

    fn require_user(&self, conn: &Connection, id: UserId) -> ServiceResult<()> {
        match SqliteUserRepository::new(conn).get_user(id)? {
            Some(_) => Ok(()),
            None => Err(ServiceError::NotFound(EntityRef::new(EntityKind::User, id))),
        }
    }
}
