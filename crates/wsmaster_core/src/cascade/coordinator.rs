//! Removal coordinator: transaction-scoped cascade removal of one entity.
//!
//! # Responsibility
//! - Open (or join) the removal transaction.
//! - Publish the before-removal event, verify the dependents are gone,
//!   delete the entity's own record and commit.
//!
//! # Invariants
//! - Stages advance `Started -> EventPublished -> DependentsRemoved ->
//!   RootDeleted -> Committed`; any failure ends in `RolledBack`.
//! - The transaction is rolled back before an error reaches the caller.
//! - Removing a missing id fails with `NotFound` and writes nothing.
//! - Dependents the root store knows about are counted after the event;
//!   anything else still referencing the entity is caught by its foreign key
//!   and reported as `Conflict`, like a missing subscriber.

use super::bus::EventBus;
use super::error::{CascadeError, RemovalError};
use super::event::EntityRef;
use super::scope::CascadeScope;
use super::store::RootStore;
use crate::repo::account_repo::AccountStore;
use crate::repo::RepoError;
use crate::repo::user_repo::UserStore;
use crate::repo::workspace_repo::WorkspaceStore;
use log::{debug, error, info, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

/// Progress of one removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RemovalStage {
    Started,
    EventPublished,
    DependentsRemoved,
    RootDeleted,
    Committed,
    RolledBack,
}

impl RemovalStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::EventPublished => "event_published",
            Self::DependentsRemoved => "dependents_removed",
            Self::RootDeleted => "root_deleted",
            Self::Committed => "committed",
            Self::RolledBack => "rolled_back",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::RolledBack)
    }
}

impl Display for RemovalStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type AccountRemoval = RemovalCoordinator<AccountStore>;
pub type UserRemoval = RemovalCoordinator<UserStore>;
pub type WorkspaceRemoval = RemovalCoordinator<WorkspaceStore>;

/// Removes entities of the kind managed by `S`, cascading to dependents.
pub struct RemovalCoordinator<S: RootStore> {
    store: S,
}

impl<S: RootStore> RemovalCoordinator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Removes `id` and everything depending on it in a new transaction.
    ///
    /// `conn` must not already be inside a transaction; use
    /// [`RemovalCoordinator::remove_in`] to join an in-flight removal.
    ///
    /// # Errors
    /// Returns `RemovalError` after rolling back; the graph is unchanged.
    pub fn remove(&self, conn: &Connection, bus: &EventBus, id: Uuid) -> Result<(), RemovalError> {
        let entity = EntityRef::new(self.store.kind(), id);
        let started_at = Instant::now();
        info!(
            "event=cascade_remove module=cascade status=start entity={} id={}",
            entity.kind, entity.id
        );

        let tx = match Transaction::new_unchecked(conn, TransactionBehavior::Immediate) {
            Ok(tx) => tx,
            Err(err) => {
                let err = CascadeError::from(err).at(entity, RemovalStage::Started);
                log_failure(&err, started_at);
                return Err(err);
            }
        };

        let outcome = {
            let scope = CascadeScope::new(&tx, bus);
            self.run(&scope, entity)
        };

        if let Err(err) = outcome {
            if let Err(rollback_err) = tx.rollback() {
                warn!(
                    "event=cascade_rollback module=cascade status=error entity={} id={} error={}",
                    entity.kind, entity.id, rollback_err
                );
            }
            log_failure(&err, started_at);
            return Err(err);
        }

        if let Err(err) = tx.commit() {
            let err = CascadeError::from(err).at(entity, RemovalStage::RootDeleted);
            log_failure(&err, started_at);
            return Err(err);
        }

        info!(
            "event=cascade_remove module=cascade status=ok entity={} id={} stage={} duration_ms={}",
            entity.kind,
            entity.id,
            RemovalStage::Committed,
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    /// Removes `id` inside an in-flight removal, sharing its transaction.
    ///
    /// Commit and rollback stay with the coordinator that opened the scope.
    pub fn remove_in(&self, scope: &CascadeScope<'_>, id: Uuid) -> Result<(), RemovalError> {
        let entity = EntityRef::new(self.store.kind(), id);
        let nested = scope
            .nested()
            .map_err(|err| err.at(entity, RemovalStage::Started))?;
        debug!(
            "event=cascade_remove_nested module=cascade status=start entity={} id={} depth={}",
            entity.kind,
            entity.id,
            nested.depth()
        );
        self.run(&nested, entity)
    }

    fn run(&self, scope: &CascadeScope<'_>, entity: EntityRef) -> Result<(), RemovalError> {
        let conn = scope.connection();
        let mut stage = RemovalStage::Started;

        let exists = self
            .store
            .exists(conn, entity.id)
            .map_err(|err| CascadeError::from(err).at(entity, stage))?;
        if !exists {
            return Err(CascadeError::NotFound(entity).at(entity, stage));
        }
        self.store
            .check_removable(conn, entity.id)
            .map_err(|err| err.at(entity, stage))?;

        scope
            .publish(&self.store.before_removed(entity.id))
            .map_err(|err| err.at(entity, stage))?;
        stage = advance(entity, stage, RemovalStage::EventPublished);

        let remaining = self
            .store
            .count_dependents(conn, entity.id)
            .map_err(|err| CascadeError::from(err).at(entity, stage))?;
        if remaining > 0 {
            return Err(CascadeError::Conflict(format!(
                "{entity} still has {remaining} dependent record(s) after cascade"
            ))
            .at(entity, stage));
        }
        stage = advance(entity, stage, RemovalStage::DependentsRemoved);

        let deleted = self
            .store
            .delete_record(scope, entity.id)
            .map_err(|err| classify_delete_failure(entity, err).at(entity, stage))?;
        if deleted != 1 {
            return Err(CascadeError::Conflict(format!(
                "{entity} disappeared during removal"
            ))
            .at(entity, stage));
        }
        advance(entity, stage, RemovalStage::RootDeleted);
        Ok(())
    }
}

/// Rows the store does not count can still reference the entity; the
/// foreign key rejects the delete and nobody cascaded to them.
fn classify_delete_failure(entity: EntityRef, err: RepoError) -> CascadeError {
    match err {
        RepoError::Db(db) if db.is_constraint_violation() => CascadeError::Conflict(format!(
            "{entity} is still referenced by records no subscriber removed: {db}"
        )),
        other => other.into(),
    }
}

fn advance(entity: EntityRef, from: RemovalStage, to: RemovalStage) -> RemovalStage {
    debug!(
        "event=cascade_stage module=cascade status=ok entity={} from={} to={}",
        entity, from, to
    );
    to
}

fn log_failure(err: &RemovalError, started_at: Instant) {
    let (failed_entity, cause) = err.root_cause();
    error!(
        "event=cascade_remove module=cascade status=error entity={} id={} stage={} failed_stage={} class={:?} failed_entity={} duration_ms={} error={}",
        err.entity.kind,
        err.entity.id,
        RemovalStage::RolledBack,
        err.stage,
        err.class(),
        failed_entity,
        started_at.elapsed().as_millis(),
        cause
    );
}

#[cfg(test)]
mod tests {
    use super::RemovalStage;

    #[test]
    fn only_committed_and_rolled_back_are_terminal() {
        for stage in [
            RemovalStage::Started,
            RemovalStage::EventPublished,
            RemovalStage::DependentsRemoved,
            RemovalStage::RootDeleted,
        ] {
            assert!(!stage.is_terminal(), "{stage} must not be terminal");
        }
        assert!(RemovalStage::Committed.is_terminal());
        assert!(RemovalStage::RolledBack.is_terminal());
    }

    #[test]
    fn stages_are_ordered_by_progress() {
        assert!(RemovalStage::Started < RemovalStage::EventPublished);
        assert!(RemovalStage::DependentsRemoved < RemovalStage::RootDeleted);
        assert_eq!(RemovalStage::RootDeleted.to_string(), "root_deleted");
    }
}
