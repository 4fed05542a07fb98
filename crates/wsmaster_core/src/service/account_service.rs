//! Account manager.

use crate::cascade::{AccountRemoval, EventBus};
use crate::model::account::{Account, AccountId};
use crate::repo::account_repo::{AccountRepository, AccountStore, SqliteAccountRepository};
use crate::service::ServiceResult;
use log::info;
use rusqlite::Connection;
use std::sync::Arc;

pub struct AccountManager<'conn> {
    conn: &'conn Connection,
    bus: Arc<EventBus>,
    removal: AccountRemoval,
}

impl<'conn> AccountManager<'conn> {
    pub fn new(conn: &'conn Connection, bus: Arc<EventBus>) -> Self {
        Self {
            conn,
            bus,
            removal: AccountRemoval::new(AccountStore),
        }
    }

    pub fn create(&self, account: &Account) -> ServiceResult<Account> {
        SqliteAccountRepository::new(self.conn).create_account(account)?;
        info!(
            "event=account_create module=service status=ok id={} kind={}",
            account.id,
            account.kind.as_str()
        );
        Ok(account.clone())
    }

    pub fn get_by_id(&self, id: AccountId) -> ServiceResult<Option<Account>> {
        Ok(SqliteAccountRepository::new(self.conn).get_account(id)?)
    }

    pub fn get_by_name(&self, name: &str) -> ServiceResult<Option<Account>> {
        Ok(SqliteAccountRepository::new(self.conn).get_account_by_name(name)?)
    }

    /// Removes the account with all of its workspaces and their snapshots.
    pub fn remove(&self, id: AccountId) -> ServiceResult<()> {
        self.removal.remove(self.conn, &self.bus, id)?;
        Ok(())
    }
}
