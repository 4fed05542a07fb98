mod common;

use common::{seed_graph, GRAPH_TABLES};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Barrier};
use std::thread;
use uuid::Uuid;
use wsmaster_core::{
    open_db, AccountManager, CascadeErrorClass, DbOptions, DefaultSubscribers, EventBus,
    NoRuntimes, ServiceError, ServiceResult, UserManager,
};

fn shared_bus() -> Arc<EventBus> {
    let bus = Arc::new(EventBus::new());
    DefaultSubscribers::new(Arc::new(NoRuntimes)).install(&bus);
    bus
}

fn seeded_file_db(dir: &Path) -> (PathBuf, Uuid, Uuid) {
    let path = dir.join("wsmaster.db");
    let conn = open_db(&path, &DbOptions::default()).unwrap();
    let graph = seed_graph(&conn, &shared_bus(), "bobby");
    (path, graph.account.id, graph.user.id)
}

fn spawn_removal(
    path: PathBuf,
    bus: Arc<EventBus>,
    barrier: Arc<Barrier>,
    remove: impl FnOnce(&rusqlite::Connection, Arc<EventBus>) -> ServiceResult<()> + Send + 'static,
) -> thread::JoinHandle<ServiceResult<()>> {
    thread::spawn(move || {
        let conn = open_db(&path, &DbOptions::default()).unwrap();
        barrier.wait();
        remove(&conn, bus)
    })
}

#[test]
fn racing_removals_of_one_account_commit_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let (path, account_id, _) = seeded_file_db(dir.path());
    let bus = shared_bus();
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            spawn_removal(path.clone(), Arc::clone(&bus), Arc::clone(&barrier), move |conn, bus| {
                AccountManager::new(conn, bus).remove(account_id)
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
    for result in results {
        if let Err(err) = result {
            match err {
                ServiceError::Removal(err) => assert!(
                    matches!(
                        err.class(),
                        CascadeErrorClass::NotFound | CascadeErrorClass::Conflict
                    ),
                    "unexpected failure class {:?}",
                    err.class()
                ),
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    let conn = open_db(&path, &DbOptions::default()).unwrap();
    assert_eq!(common::table_count(&conn, "workspaces"), 0);
    assert_eq!(common::table_count(&conn, "snapshots"), 0);
}

#[test]
fn account_and_user_removals_run_in_parallel() {
    let dir = tempfile::tempdir().unwrap();
    let (path, account_id, user_id) = seeded_file_db(dir.path());
    let bus = shared_bus();
    let barrier = Arc::new(Barrier::new(2));

    let account = spawn_removal(path.clone(), Arc::clone(&bus), Arc::clone(&barrier), move |conn, bus| {
        AccountManager::new(conn, bus).remove(account_id)
    });
    let user = spawn_removal(path.clone(), Arc::clone(&bus), Arc::clone(&barrier), move |conn, bus| {
        UserManager::new(conn, bus).remove(user_id)
    });

    account.join().unwrap().unwrap();
    user.join().unwrap().unwrap();

    let conn = open_db(&path, &DbOptions::default()).unwrap();
    for table in GRAPH_TABLES {
        assert_eq!(common::table_count(&conn, table), 0, "table {table} is not empty");
    }
}
