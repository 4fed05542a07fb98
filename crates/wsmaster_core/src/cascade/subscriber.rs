//! Subscriber contract and the generic "remove what this owner owns" handler.

use super::error::{CascadeError, CascadeResult};
use super::event::CascadeEvent;
use super::scope::CascadeScope;
use super::store::DependentStore;
use log::debug;

/// Handler bound to one before-removal event kind.
///
/// Implementations remove the dependents of the event's entity through the
/// scope's transaction and must never delete that entity itself. Errors are
/// returned, never swallowed; any error rolls the whole removal back.
pub trait CascadeSubscriber: Send + Sync {
    /// Stable name used in logs and diagnostics.
    fn name(&self) -> &'static str;

    fn on_event(&self, scope: &CascadeScope<'_>, event: &CascadeEvent) -> CascadeResult<()>;
}

/// Removes every entity a `DependentStore` resolves for the event's owner.
pub struct RemoveOwnedEntities<S: DependentStore> {
    name: &'static str,
    store: S,
}

impl<S: DependentStore> RemoveOwnedEntities<S> {
    pub fn new(name: &'static str, store: S) -> Self {
        Self { name, store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: DependentStore> CascadeSubscriber for RemoveOwnedEntities<S> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn on_event(&self, scope: &CascadeScope<'_>, event: &CascadeEvent) -> CascadeResult<()> {
        let owner_id = event.entity_id();
        let owned = self.store.find_by_owner(scope, owner_id)?;
        if owned.is_empty() {
            return Ok(());
        }

        let removed = self.store.remove_all(scope, owner_id)?;
        if removed != owned.len() {
            return Err(CascadeError::Subscriber {
                subscriber: self.name,
                message: format!(
                    "resolved {} {} record(s) of {} but removed {removed}",
                    owned.len(),
                    self.store.kind(),
                    event.entity()
                ),
            });
        }

        debug!(
            "event=cascade_dependents_removed module=cascade status=ok subscriber={} owner={} kind={} count={}",
            self.name,
            event.entity(),
            self.store.kind(),
            removed
        );
        Ok(())
    }
}
