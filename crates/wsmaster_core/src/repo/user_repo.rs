//! User repository and root store.
//!
//! # Invariants
//! - User names and emails are unique; duplicates surface as `Conflict`.
//! - A user may be deleted only after its profile, preferences and ssh
//!   pairs are gone.

use crate::cascade::{CascadeEvent, CascadeScope, EntityKind, RootStore};
use crate::model::user::{User, UserId};
use crate::repo::{count_rows, map_insert_error, parse_uuid, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

const USER_SELECT_SQL: &str = "SELECT id, name, email FROM users";

/// Tables holding rows owned by a user, with their owner column.
const USER_DEPENDENT_TABLES: &[(&str, &str)] = &[
    ("profiles", "user_id"),
    ("preferences", "user_id"),
    ("ssh_pairs", "owner"),
];

pub trait UserRepository {
    fn create_user(&self, user: &User) -> RepoResult<()>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    fn get_user_by_name(&self, name: &str) -> RepoResult<Option<User>>;
    fn get_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
}

pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn find_one(&self, column: &str, value: &str) -> RepoResult<Option<User>> {
        let row = self
            .conn
            .query_row(
                &format!("{USER_SELECT_SQL} WHERE {column} = ?1;"),
                [value],
                read_user_row,
            )
            .optional()?;
        row.map(parse_user_row).transpose()
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, user: &User) -> RepoResult<()> {
        user.validate()?;
        self.conn
            .execute(
                "INSERT INTO users (id, name, email) VALUES (?1, ?2, ?3);",
                params![user.id.to_string(), user.name.as_str(), user.email.as_str()],
            )
            .map_err(|err| {
                map_insert_error(err, || {
                    format!(
                        "user with id `{}`, name `{}` or email `{}` already exists",
                        user.id, user.name, user.email
                    )
                })
            })?;
        Ok(())
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        self.find_one("id", &id.to_string())
    }

    fn get_user_by_name(&self, name: &str) -> RepoResult<Option<User>> {
        self.find_one("name", name)
    }

    fn get_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        self.find_one("email", email)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UserStore;

impl RootStore for UserStore {
    fn kind(&self) -> EntityKind {
        EntityKind::User
    }

    fn before_removed(&self, id: Uuid) -> CascadeEvent {
        CascadeEvent::BeforeUserRemoved(id)
    }

    fn exists(&self, conn: &Connection, id: Uuid) -> RepoResult<bool> {
        Ok(count_rows(conn, "users", "id", id)? > 0)
    }

    fn count_dependents(&self, conn: &Connection, id: Uuid) -> RepoResult<usize> {
        let mut total = 0;
        for (table, column) in USER_DEPENDENT_TABLES {
            total += count_rows(conn, table, column, id)?;
        }
        Ok(total)
    }

    fn delete_record(&self, scope: &CascadeScope<'_>, id: Uuid) -> RepoResult<usize> {
        let removed = scope
            .connection()
            .execute("DELETE FROM users WHERE id = ?1;", [id.to_string()])?;
        Ok(removed)
    }
}

type UserRow = (String, String, String);

fn read_user_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok((row.get("id")?, row.get("name")?, row.get("email")?))
}

fn parse_user_row((id, name, email): UserRow) -> RepoResult<User> {
    Ok(User {
        id: parse_uuid(&id, "users.id")?,
        name,
        email,
    })
}
