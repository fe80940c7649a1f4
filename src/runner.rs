//! Concurrent execution of all checks across all claims.
//!
//! One task per eligible check, no ordering guarantees between them. The
//! deadline is advisory: it stops waiting and flags new tasks off, but a
//! check already inside an external call is not killed. Every completed
//! check writes exactly one record into the state store; the store is
//! flushed to disk exactly once per run.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::check::{Check, CheckContext};
use crate::claims::Claim;
use crate::state::{LastState, StateStore};

/// Filters and limits for one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Check UUIDs to skip.
    pub skip: Vec<String>,

    /// When set, only the check with this UUID runs; the skip list is
    /// ignored.
    pub only: Option<String>,

    /// Wall-clock budget for the whole run.
    pub deadline: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            skip: Vec::new(),
            only: None,
            deadline: Duration::from_secs(60),
        }
    }
}

/// What happened to a run as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    /// Whether the deadline fired before every task finished.
    pub timed_out: bool,
}

fn wrap_status(check: &dyn Check) -> String {
    if check.passed() {
        format!("[OK] {}", check.status())
    } else {
        format!("[FAIL] {}", check.status())
    }
}

/// Run every eligible check across `claims` concurrently, aggregate the
/// outcomes into `store`, and commit the store once.
///
/// Blocks until all tasks finish or the deadline fires. Tasks still in
/// flight at the deadline keep running detached; results they produce
/// afterwards land in memory but miss this run's commit.
pub async fn run_all(
    claims: Vec<Claim>,
    ctx: Arc<CheckContext>,
    store: Arc<StateStore>,
    opts: RunOptions,
) -> RunOutcome {
    info!("starting checks");

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let mut tasks = Vec::new();

    for claim in claims {
        for mut check in claim.checks {
            let eligible = match &opts.only {
                Some(only) => check.uuid() == only,
                None => !opts.skip.iter().any(|uuid| uuid == check.uuid()),
            };
            if !eligible {
                warn!(
                    claim = %claim.title,
                    check = check.name(),
                    "[SKIP] skipped by the command rule"
                );
                continue;
            }

            let ctx = Arc::clone(&ctx);
            let store = Arc::clone(&store);
            let cancel = cancel_rx.clone();
            let claim_title = claim.title.clone();

            tasks.push(tokio::spawn(async move {
                if *cancel.borrow() {
                    return;
                }

                if !check.is_runnable(&ctx).await {
                    warn!(
                        claim = %claim_title,
                        check = check.name(),
                        status = %check.status(),
                        "check is not runnable"
                    );
                    return;
                }

                if let Err(e) = check.run(&ctx).await {
                    warn!(
                        claim = %claim_title,
                        check = check.name(),
                        error = %e,
                        "check failed to run"
                    );
                }

                if check.passed() {
                    info!(claim = %claim_title, check = check.name(), "{}", wrap_status(check.as_ref()));
                } else {
                    warn!(claim = %claim_title, check = check.name(), "{}", wrap_status(check.as_ref()));
                }

                store.update(LastState {
                    uuid: check.uuid().to_owned(),
                    name: check.name().to_owned(),
                    state: check.passed(),
                    details: check.status(),
                });
            }));
        }
    }

    let join_all = async {
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "check task panicked");
            }
        }
    };
    let timed_out = tokio::time::timeout(opts.deadline, join_all).await.is_err();
    if timed_out {
        let _ = cancel_tx.send(true);
        warn!("deadline hit before all checks finished");
    }

    if let Err(e) = store.commit() {
        warn!(error = %e, "failed to commit last state");
    }

    info!("checks completed");
    RunOutcome { timed_out }
}

/// JSON document describing every claim and check: claim title to a map of
/// check UUID to `[passed message, failed message]`.
///
/// # Errors
///
/// Returns the underlying serialization error, which should not happen for
/// this shape.
pub fn schema_json(claims: &[Claim]) -> Result<String, serde_json::Error> {
    let mut schema: BTreeMap<&str, BTreeMap<&str, [&str; 2]>> = BTreeMap::new();
    for claim in claims {
        let checks = schema.entry(claim.title.as_str()).or_default();
        for check in &claim.checks {
            checks.insert(
                check.uuid(),
                [check.passed_message(), check.failed_message()],
            );
        }
    }
    serde_json::to_string_pretty(&schema)
}
