//! Vigil CLI entry point.
//!
//! Provides `check`, `status`, `schema`, and `helper` subcommands for
//! running the audit, inspecting cached results, describing the check
//! catalog, and serving privileged checks to unprivileged callers.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::net::UnixListener;
use tracing::{error, info, warn};

use vigil::check::CheckContext;
use vigil::config::{runtime_paths, RuntimePaths};
use vigil::helper::HelperClient;
use vigil::runner::{self, RunOptions};
use vigil::state::StateStore;
use vigil::system::{HostSystem, System};
use vigil::{claims, helper, logging};

/// Vigil: device security posture auditor.
#[derive(Parser)]
#[command(name = "vigil", version, about)]
struct Cli {
    /// Output verbose logs.
    #[arg(long, global = true)]
    verbose: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Run checks on this system.
    Check {
        /// Skip checks by UUID. May be given multiple times.
        #[arg(long, value_name = "UUID")]
        skip: Vec<String>,

        /// Only run the check with this UUID.
        #[arg(long, value_name = "UUID")]
        only: Option<String>,
    },
    /// Print the last known status of the checks without running them.
    Status,
    /// Print the claims and checks schema as JSON.
    Schema,
    /// Run the privileged helper server (root only).
    Helper {
        /// Listen on this socket path instead of the default.
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },
}

/// Wall-clock budget for one full check run.
const CHECK_DEADLINE: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Check { skip, only } => handle_check(cli.verbose, skip, only).await,
        Command::Status => handle_status(cli.verbose),
        Command::Schema => handle_schema(cli.verbose),
        Command::Helper { socket } => handle_helper(socket).await,
    }
}

/// Run the audit and exit non-zero when anything failed or timed out.
async fn handle_check(
    verbose: bool,
    skip: Vec<String>,
    only: Option<String>,
) -> anyhow::Result<()> {
    logging::init_cli(verbose);
    let paths = runtime_paths();

    let system: Arc<dyn System> = Arc::new(HostSystem::new());
    if system.is_root() {
        warn!("please run as a normal user; desktop session checks will not report correctly");
    }

    let helper_client = Arc::new(HelperClient::new(paths.helper_socket.clone()));
    let ctx = Arc::new(CheckContext::new(system, helper_client));
    let store = Arc::new(StateStore::open(paths.state_file.clone()));

    let outcome = runner::run_all(
        claims::all(),
        ctx,
        Arc::clone(&store),
        RunOptions {
            skip,
            only,
            deadline: CHECK_DEADLINE,
        },
    )
    .await;

    if outcome.timed_out {
        warn!("check run timed out");
        std::process::exit(1);
    }

    if !store.all_passed() {
        if verbose {
            for state in store.failed() {
                error!("failed check: {} (UUID: {})", state.name, state.uuid);
            }
        } else {
            info!("run `vigil check --verbose` for a detailed report");
        }
        std::process::exit(1);
    }

    Ok(())
}

/// Print all cached states without running any checks.
fn handle_status(verbose: bool) -> anyhow::Result<()> {
    logging::init_cli(verbose);
    let paths = runtime_paths();
    let store = StateStore::open(paths.state_file);

    let states = store.all();
    println!("Loaded {} states from {}", states.len(), store.path().display());
    if let Some(modified) = store.last_modified() {
        let stamp: chrono::DateTime<chrono::Local> = modified.into();
        println!("Last modified: {}", stamp.to_rfc3339());
    }
    println!();

    println!("{:<38} {:<50} {:<6} DETAILS", "UUID", "NAME", "STATE");
    for state in states.values() {
        println!(
            "{:<38} {:<50} {:<6} {}",
            state.uuid,
            state.name,
            if state.state { "Pass" } else { "Fail" },
            state.details,
        );
    }
    Ok(())
}

/// Print the check catalog as JSON.
fn handle_schema(verbose: bool) -> anyhow::Result<()> {
    logging::init_cli(verbose);
    let schema = runner::schema_json(&claims::all()).context("cannot marshal schema")?;
    println!("{schema}");
    Ok(())
}

/// Run the privileged helper server on the Unix socket.
async fn handle_helper(socket: Option<PathBuf>) -> anyhow::Result<()> {
    let paths: RuntimePaths = runtime_paths();
    let socket_path = socket.unwrap_or(paths.helper_socket);

    let _logging_guard = logging::init_helper(&paths.logs_dir)?;

    let system: Arc<dyn System> = Arc::new(HostSystem::new());
    if !system.is_root() {
        anyhow::bail!("the helper must run as root");
    }

    // A leftover socket from an earlier run would make bind fail.
    if socket_path.exists() {
        std::fs::remove_file(&socket_path)
            .with_context(|| format!("failed to remove stale socket {}", socket_path.display()))?;
    }
    let listener = UnixListener::bind(&socket_path)
        .with_context(|| format!("failed to bind helper socket {}", socket_path.display()))?;

    // Filesystem permissions are the only authentication on this channel;
    // unprivileged clients need connect (write) access.
    std::fs::set_permissions(&socket_path, std::fs::Permissions::from_mode(0o666))
        .with_context(|| format!("failed to set socket permissions {}", socket_path.display()))?;

    info!(socket = %socket_path.display(), "starting privileged helper");
    let helper_client = Arc::new(HelperClient::new(socket_path));
    let ctx = Arc::new(CheckContext::new(system, helper_client));
    helper::server::run(listener, ctx)
        .await
        .context("helper server failed")
}
