#![allow(dead_code)]

use rusqlite::types::Value;
use rusqlite::Connection;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;
use wsmaster_core::{
    open_db_in_memory, Account, AccountManager, DefaultSubscribers, EventBus, NoRuntimes,
    Preferences, Snapshot, SshPair, User, UserManager, Workspace, WorkspaceManager,
};

/// Every table of the entity graph, in dump order.
pub const GRAPH_TABLES: &[&str] = &[
    "accounts",
    "users",
    "profiles",
    "profile_attributes",
    "preferences",
    "ssh_pairs",
    "workspaces",
    "snapshots",
];

pub struct Fixture {
    pub conn: Connection,
    pub bus: Arc<EventBus>,
    pub defaults: DefaultSubscribers,
}

impl Fixture {
    pub fn accounts(&self) -> AccountManager<'_> {
        AccountManager::new(&self.conn, Arc::clone(&self.bus))
    }

    pub fn users(&self) -> UserManager<'_> {
        UserManager::new(&self.conn, Arc::clone(&self.bus))
    }

    pub fn workspaces(&self) -> WorkspaceManager<'_> {
        WorkspaceManager::new(&self.conn, Arc::clone(&self.bus))
    }
}

/// In-memory database with the default subscribers on a private bus.
pub fn fixture() -> Fixture {
    let conn = open_db_in_memory().expect("open in-memory db");
    let bus = Arc::new(EventBus::new());
    let defaults = DefaultSubscribers::new(Arc::new(NoRuntimes));
    defaults.install(&bus);
    Fixture {
        conn,
        bus,
        defaults,
    }
}

pub struct SeededGraph {
    pub account: Account,
    pub user: User,
    pub preferences: Preferences,
    pub ssh_pairs: Vec<SshPair>,
    pub workspaces: Vec<Workspace>,
    pub snapshots: Vec<Snapshot>,
}

/// Account and user named `name` with a profile, three preferences, two ssh
/// pairs and two workspaces holding two snapshots each.
pub fn seed_graph(conn: &Connection, bus: &Arc<EventBus>, name: &str) -> SeededGraph {
    let accounts = AccountManager::new(conn, Arc::clone(bus));
    let users = UserManager::new(conn, Arc::clone(bus));
    let workspaces = WorkspaceManager::new(conn, Arc::clone(bus));

    let account = accounts
        .create(&Account::personal(name))
        .expect("seed account");
    let user = users
        .create(
            &User::new(name, format!("{name}@example.com")),
            BTreeMap::from([
                ("firstName".to_string(), name.to_string()),
                ("company".to_string(), "codenvy".to_string()),
            ]),
        )
        .expect("seed user with profile");

    let preferences: Preferences = BTreeMap::from([
        ("pref1".to_string(), "value1".to_string()),
        ("pref2".to_string(), "value2".to_string()),
        ("pref3".to_string(), "value3".to_string()),
    ]);
    users
        .update_preferences(user.id, &preferences)
        .expect("seed preferences");

    let ssh_pairs = vec![
        SshPair::new(user.id, "service", "name1").with_keys("public", "private"),
        SshPair::new(user.id, "service", "name2").with_keys("public", "private"),
    ];
    for pair in &ssh_pairs {
        users.create_ssh_pair(pair).expect("seed ssh pair");
    }

    let mut seeded_workspaces = Vec::new();
    let mut snapshots = Vec::new();
    for (index, ws_name) in ["workspace1", "workspace2"].into_iter().enumerate() {
        let workspace = workspaces
            .create_workspace(&Workspace::new(account.id, ws_name))
            .expect("seed workspace");
        for (machine, offset) in [("machine1", 1), ("machine2", 2)] {
            let snapshot = Snapshot::new(
                workspace.id,
                "env",
                machine,
                1_000 * (index as i64 + 1) + offset,
            );
            workspaces.save_snapshot(&snapshot).expect("seed snapshot");
            snapshots.push(snapshot);
        }
        seeded_workspaces.push(workspace);
    }

    SeededGraph {
        account,
        user,
        preferences,
        ssh_pairs,
        workspaces: seeded_workspaces,
        snapshots,
    }
}

/// Full contents of every graph table, rows rendered and sorted.
pub fn dump_graph(conn: &Connection) -> BTreeMap<&'static str, Vec<Vec<String>>> {
    let mut dump = BTreeMap::new();
    for table in GRAPH_TABLES {
        let mut stmt = conn
            .prepare(&format!("SELECT * FROM {table};"))
            .expect("prepare table dump");
        let columns = stmt.column_count();
        let mut rows = stmt
            .query_map([], |row| {
                (0..columns)
                    .map(|index| row.get::<_, Value>(index).map(|value| format!("{value:?}")))
                    .collect::<Result<Vec<_>, _>>()
            })
            .expect("query table dump")
            .collect::<Result<Vec<_>, _>>()
            .expect("read table dump");
        rows.sort();
        dump.insert(*table, rows);
    }
    dump
}

pub fn table_count(conn: &Connection, table: &str) -> usize {
    let count: i64 = conn
        .query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| row.get(0))
        .expect("count table rows");
    count as usize
}

pub fn rows_owned_by(conn: &Connection, table: &str, column: &str, owner: Uuid) -> usize {
    let count: i64 = conn
        .query_row(
            &format!("SELECT COUNT(*) FROM {table} WHERE {column} = ?1;"),
            [owner.to_string()],
            |row| row.get(0),
        )
        .expect("count owned rows");
    count as usize
}
