//! Demo driver for cascade removal.
//!
//! Seeds one account/user graph, removes the account and then the user, and
//! prints how many rows of each kind are left.

use clap::Parser;
use log::{error, info};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use wsmaster_core::{
    global_bus, init_from_config, open_db, Account, AccountManager, CoreConfig, DefaultSubscribers,
    NoRuntimes, Preferences, ServiceError, Snapshot, SshPair, User, UserManager, Workspace,
    WorkspaceManager,
};

#[derive(Parser)]
#[command(name = "wsmaster_cli")]
#[command(about = "Seed a demo graph and remove it through cascade removal", long_about = None)]
struct Cli {
    /// TOML config file; `WSMASTER_*` variables override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SQLite database file to seed and clean; defaults to the config's
    /// `database_path`
    db_path: Option<PathBuf>,
}

/// Command-line path first, then the configured one.
fn database_path<'a>(cli: &'a Cli, config: &'a CoreConfig) -> &'a Path {
    cli.db_path.as_deref().unwrap_or(&config.database_path)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_run module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => CoreConfig::load(path)?,
        None => CoreConfig::from_env()?,
    };
    init_from_config(&config)?;

    let db_path = database_path(cli, &config);
    info!(
        "event=cli_run module=cli status=start db_path={}",
        db_path.display()
    );
    let conn = open_db(db_path, &config.db_options())?;
    let bus = global_bus();
    DefaultSubscribers::new(Arc::new(NoRuntimes)).install(&bus);

    let accounts = AccountManager::new(&conn, Arc::clone(&bus));
    let users = UserManager::new(&conn, Arc::clone(&bus));
    let workspaces = WorkspaceManager::new(&conn, Arc::clone(&bus));

    let (account, user) = seed(&accounts, &users, &workspaces, "bobby")?;
    print_counts("seeded", &accounts, &users, &workspaces, "bobby")?;

    accounts.remove(account.id)?;
    print_counts("account removed", &accounts, &users, &workspaces, "bobby")?;

    users.remove(user.id)?;
    print_counts("user removed", &accounts, &users, &workspaces, "bobby")?;

    info!("event=cli_run module=cli status=ok");
    Ok(())
}

fn seed(
    accounts: &AccountManager<'_>,
    users: &UserManager<'_>,
    workspaces: &WorkspaceManager<'_>,
    name: &str,
) -> Result<(Account, User), ServiceError> {
    let account = accounts.create(&Account::personal(name))?;
    let user = users.create(
        &User::new(name, format!("{name}@example.com")),
        BTreeMap::from([("firstName".to_string(), name.to_string())]),
    )?;

    let preferences: Preferences = BTreeMap::from([
        ("theme".to_string(), "dark".to_string()),
        ("editor".to_string(), "vim".to_string()),
    ]);
    users.update_preferences(user.id, &preferences)?;
    users.create_ssh_pair(&SshPair::new(user.id, "vcs", "github").with_keys("ssh-rsa AAAA", "secret"))?;

    for ws_name in ["ws1", "ws2"] {
        let workspace = workspaces.create_workspace(&Workspace::new(account.id, ws_name))?;
        workspaces.save_snapshot(&Snapshot::new(workspace.id, "default", "dev-machine", 0))?;
    }
    Ok((account, user))
}

fn print_counts(
    label: &str,
    accounts: &AccountManager<'_>,
    users: &UserManager<'_>,
    workspaces: &WorkspaceManager<'_>,
    name: &str,
) -> Result<(), ServiceError> {
    let counts = count_remaining(accounts, users, workspaces, name)?
        .into_iter()
        .map(|(kind, count)| format!("{kind}={count}"))
        .collect::<Vec<_>>()
        .join(" ");
    println!("{label}: {counts}");
    Ok(())
}

/// Rows left for the seeded name, as seen through the managers.
fn count_remaining(
    accounts: &AccountManager<'_>,
    users: &UserManager<'_>,
    workspaces: &WorkspaceManager<'_>,
    name: &str,
) -> Result<Vec<(&'static str, usize)>, ServiceError> {
    let account = accounts.get_by_name(name)?;
    let user = users.get_by_name(name)?;
    let workspace_count = workspaces.get_by_namespace(name)?.len();
    let (profiles, preferences, ssh_pairs) = match &user {
        Some(user) => (
            usize::from(users.get_profile(user.id)?.is_some()),
            users.get_preferences(user.id)?.len(),
            users.get_ssh_pairs(user.id, None)?.len(),
        ),
        None => (0, 0, 0),
    };
    Ok(vec![
        ("accounts", usize::from(account.is_some())),
        ("workspaces", workspace_count),
        ("users", usize::from(user.is_some())),
        ("profiles", profiles),
        ("preferences", preferences),
        ("ssh_pairs", ssh_pairs),
    ])
}
