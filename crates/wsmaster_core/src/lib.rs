//! Core of the workspace master: entity storage and event-driven cascade
//! removal of accounts, users and workspaces.

pub mod cascade;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use cascade::{
    global_bus, AccountRemoval, CascadeError, CascadeErrorClass, CascadeEvent, CascadeEventKind,
    CascadeResult, CascadeScope, CascadeSubscriber, DefaultSubscribers, DependentStore, EntityKind,
    EntityRef, EventBus, RemovalCoordinator, RemovalError, RemovalStage, RootStore, UserRemoval,
    WorkspaceRemoval,
};
pub use config::{ConfigError, CoreConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbOptions, DbResult};
pub use logging::{
    default_log_level, init_from_config, init_logging, logging_status, parse_level, LogSettings,
    LoggingError,
};
pub use model::account::{Account, AccountId, AccountKind};
pub use model::ssh::SshPair;
pub use model::user::{Preferences, Profile, User, UserId};
pub use model::workspace::{Snapshot, SnapshotId, Workspace, WorkspaceId};
pub use model::ValidationError;
pub use repo::workspace_repo::{NoRuntimes, WorkspaceRuntimes};
pub use repo::{RepoError, RepoResult};
pub use service::account_service::AccountManager;
pub use service::user_service::UserManager;
pub use service::workspace_service::WorkspaceManager;
pub use service::{ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
