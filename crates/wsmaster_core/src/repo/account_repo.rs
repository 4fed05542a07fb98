//! Account repository and root store.

use crate::cascade::{CascadeEvent, CascadeScope, EntityKind, EntityRef, RootStore};
use crate::model::account::{Account, AccountId, AccountKind};
use crate::repo::{count_rows, map_insert_error, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

const ACCOUNT_SELECT_SQL: &str = "SELECT id, name, kind FROM accounts";

pub trait AccountRepository {
    fn create_account(&self, account: &Account) -> RepoResult<()>;
    fn get_account(&self, id: AccountId) -> RepoResult<Option<Account>>;
    fn get_account_by_name(&self, name: &str) -> RepoResult<Option<Account>>;
}

pub struct SqliteAccountRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAccountRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl AccountRepository for SqliteAccountRepository<'_> {
    fn create_account(&self, account: &Account) -> RepoResult<()> {
        account.validate()?;
        self.conn
            .execute(
                "INSERT INTO accounts (id, name, kind) VALUES (?1, ?2, ?3);",
                params![
                    account.id.to_string(),
                    account.name.as_str(),
                    account.kind.as_str()
                ],
            )
            .map_err(|err| {
                map_insert_error(err, || {
                    format!("account with id `{}` or name `{}` already exists", account.id, account.name)
                })
            })?;
        Ok(())
    }

    fn get_account(&self, id: AccountId) -> RepoResult<Option<Account>> {
        let row = self
            .conn
            .query_row(
                &format!("{ACCOUNT_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                read_account_row,
            )
            .optional()?;
        row.map(parse_account_row).transpose()
    }

    fn get_account_by_name(&self, name: &str) -> RepoResult<Option<Account>> {
        let row = self
            .conn
            .query_row(
                &format!("{ACCOUNT_SELECT_SQL} WHERE name = ?1;"),
                [name],
                read_account_row,
            )
            .optional()?;
        row.map(parse_account_row).transpose()
    }
}

/// Root store for accounts; workspaces are their only dependents.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccountStore;

impl RootStore for AccountStore {
    fn kind(&self) -> EntityKind {
        EntityKind::Account
    }

    fn before_removed(&self, id: Uuid) -> CascadeEvent {
        CascadeEvent::BeforeAccountRemoved(id)
    }

    fn exists(&self, conn: &Connection, id: Uuid) -> RepoResult<bool> {
        Ok(count_rows(conn, "accounts", "id", id)? > 0)
    }

    fn count_dependents(&self, conn: &Connection, id: Uuid) -> RepoResult<usize> {
        count_rows(conn, "workspaces", "account_id", id)
    }

    fn delete_record(&self, scope: &CascadeScope<'_>, id: Uuid) -> RepoResult<usize> {
        let removed = scope
            .connection()
            .execute("DELETE FROM accounts WHERE id = ?1;", [id.to_string()])?;
        Ok(removed)
    }
}

type AccountRow = (String, String, String);

fn read_account_row(row: &Row<'_>) -> rusqlite::Result<AccountRow> {
    Ok((row.get("id")?, row.get("name")?, row.get("kind")?))
}

fn parse_account_row((id, name, kind): AccountRow) -> RepoResult<Account> {
    let id = parse_uuid(&id, "accounts.id")?;
    let kind = AccountKind::parse(&kind).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid account kind `{kind}` in accounts.kind"))
    })?;
    Ok(Account { id, name, kind })
}

/// Loads one account or reports it missing.
pub(crate) fn require_account(conn: &Connection, id: AccountId) -> RepoResult<Account> {
    SqliteAccountRepository::new(conn)
        .get_account(id)?
        .ok_or(RepoError::NotFound(EntityRef::new(EntityKind::Account, id)))
}
