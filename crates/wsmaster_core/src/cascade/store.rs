//! Store contracts the cascade protocol drives.
//!
//! Both traits run every statement on the connection of the scope (or the
//! connection handed in by the coordinator); stores never open transactions
//! of their own.

use super::error::CascadeResult;
use super::event::{CascadeEvent, EntityKind};
use super::scope::CascadeScope;
use crate::repo::RepoResult;
use rusqlite::Connection;
use uuid::Uuid;

/// Bulk access to the dependents of one owner.
pub trait DependentStore: Send + Sync {
    type Entity;

    /// Kind of the dependent entities this store manages.
    fn kind(&self) -> EntityKind;

    fn find_by_owner(&self, scope: &CascadeScope<'_>, owner_id: Uuid) -> RepoResult<Vec<Self::Entity>>;

    /// Deletes every dependent of `owner_id`, returning the number removed.
    fn remove_all(&self, scope: &CascadeScope<'_>, owner_id: Uuid) -> RepoResult<usize>;
}

/// Own-record access for an entity kind that has a removal coordinator.
pub trait RootStore: Send + Sync {
    fn kind(&self) -> EntityKind;

    /// Event announcing the upcoming removal of `id`.
    fn before_removed(&self, id: Uuid) -> CascadeEvent;

    fn exists(&self, conn: &Connection, id: Uuid) -> RepoResult<bool>;

    /// Dependent rows still referencing `id`; must be zero before deletion.
    fn count_dependents(&self, conn: &Connection, id: Uuid) -> RepoResult<usize>;

    /// Business precondition checked before the event is published.
    fn check_removable(&self, _conn: &Connection, _id: Uuid) -> CascadeResult<()> {
        Ok(())
    }

    /// Deletes the entity's own record, returning the number of rows removed.
    fn delete_record(&self, scope: &CascadeScope<'_>, id: Uuid) -> RepoResult<usize>;
}
