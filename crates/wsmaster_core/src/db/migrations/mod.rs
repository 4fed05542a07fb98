//! Schema of the entity graph, as ordered SQL steps.
//!
//! # Invariants
//! - Steps are numbered from 1 without gaps; the number of the last applied
//!   step is stored in `PRAGMA user_version`.
//! - Owner/dependent foreign keys never use `ON DELETE CASCADE`: removal of
//!   dependents belongs to cascade subscribers only.
//! - Pending steps run in one IMMEDIATE transaction, so a failed upgrade
//!   leaves the previous version in place.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::{Connection, TransactionBehavior};

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "accounts_users",
        sql: include_str!("0001_accounts_users.sql"),
    },
    Migration {
        version: 2,
        name: "workspaces_snapshots",
        sql: include_str!("0002_workspaces_snapshots.sql"),
    },
];

/// Schema version this build creates.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Brings `conn` up to [`latest_version`].
///
/// # Errors
/// `UnsupportedSchemaVersion` when the file was written by a newer build.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let current = schema_version(conn)?;
    let pending = pending_since(current)?;
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    for migration in pending {
        tx.execute_batch(migration.sql)?;
        tx.pragma_update(None, "user_version", migration.version)?;
        info!(
            "event=db_migrate module=db status=ok version={} name={}",
            migration.version, migration.name
        );
    }
    tx.commit()?;
    Ok(())
}

fn pending_since(current: u32) -> DbResult<&'static [Migration]> {
    let latest = latest_version();
    if current > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current,
            latest_supported: latest,
        });
    }
    // Versions are dense, so the index of version `n + 1` is `n`.
    Ok(&MIGRATIONS[current as usize..])
}

fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

#[cfg(test)]
mod tests {
    use super::{apply_migrations, latest_version, pending_since, schema_version, MIGRATIONS};
    use crate::db::DbError;
    use rusqlite::Connection;

    #[test]
    fn versions_are_dense_from_one() {
        for (index, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(migration.version as usize, index + 1, "{}", migration.name);
        }
    }

    #[test]
    fn no_foreign_key_cascades_on_delete() {
        for migration in MIGRATIONS {
            assert!(
                !migration.sql.to_ascii_uppercase().contains("ON DELETE CASCADE"),
                "{} must leave dependent removal to subscribers",
                migration.name
            );
        }
    }

    #[test]
    fn pending_steps_follow_the_stored_version() {
        assert_eq!(pending_since(0).expect("fresh schema").len(), MIGRATIONS.len());
        assert_eq!(pending_since(1).expect("partial schema")[0].version, 2);
        assert!(pending_since(latest_version()).expect("current schema").is_empty());
        assert!(matches!(
            pending_since(latest_version() + 1),
            Err(DbError::UnsupportedSchemaVersion { .. })
        ));
    }

    #[test]
    fn upgrade_from_first_version_keeps_existing_rows() {
        let mut conn = Connection::open_in_memory().expect("in-memory db");
        conn.execute_batch(MIGRATIONS[0].sql).expect("first step");
        conn.pragma_update(None, "user_version", 1).expect("stamp version");
        conn.execute(
            "INSERT INTO accounts (id, name, kind) VALUES ('a', 'bobby', 'personal');",
            [],
        )
        .expect("seed account");

        apply_migrations(&mut conn).expect("upgrade");

        assert_eq!(schema_version(&conn).expect("version"), latest_version());
        let accounts: i64 = conn
            .query_row("SELECT COUNT(*) FROM accounts;", [], |row| row.get(0))
            .expect("count accounts");
        assert_eq!(accounts, 1);
    }
}
