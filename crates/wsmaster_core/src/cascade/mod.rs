//! Event-driven cascade removal.
//!
//! # Responsibility
//! - Route before-removal events to subscribers on the caller's stack.
//! - Run each removal in one transaction that commits only when the entity
//!   and all of its transitive dependents are gone.
//!
//! # Invariants
//! - A failed removal leaves every table exactly as it was.
//! - Cross-kind ordering is expressed by chaining events: a subscriber that
//!   removes an owner of other entities runs a nested coordinator removal.

mod bus;
mod coordinator;
mod defaults;
mod error;
mod event;
mod scope;
mod store;
mod subscriber;

pub use bus::{global_bus, EventBus};
pub use coordinator::{
    AccountRemoval, RemovalCoordinator, RemovalStage, UserRemoval, WorkspaceRemoval,
};
pub use defaults::{
    DefaultSubscribers, RemoveWorkspacesBeforeAccountRemoved, REMOVE_PREFERENCES_BEFORE_USER_REMOVED,
    REMOVE_PROFILE_BEFORE_USER_REMOVED, REMOVE_SNAPSHOTS_BEFORE_WORKSPACE_REMOVED,
    REMOVE_SSH_KEYS_BEFORE_USER_REMOVED, REMOVE_WORKSPACES_BEFORE_ACCOUNT_REMOVED,
};
pub use error::{CascadeError, CascadeErrorClass, CascadeResult, RemovalError};
pub use event::{CascadeEvent, CascadeEventKind, EntityKind, EntityRef};
pub use scope::{CascadeScope, MAX_CASCADE_DEPTH};
pub use store::{DependentStore, RootStore};
pub use subscriber::{CascadeSubscriber, RemoveOwnedEntities};
