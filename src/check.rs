//! The check capability contract.

use std::sync::Arc;

use async_trait::async_trait;

use crate::helper::{HelperClient, HelperError};
use crate::system::{System, SystemError};

/// Collaborators shared by every check at evaluation time.
///
/// Built once per process and handed by reference to the runner and the
/// helper server, so tests can swap either seam.
pub struct CheckContext {
    /// Host access seam.
    pub system: Arc<dyn System>,

    /// Client for the privileged helper socket.
    pub helper: Arc<HelperClient>,
}

impl CheckContext {
    /// Bundle the host seam and helper client for check execution.
    pub fn new(system: Arc<dyn System>, helper: Arc<HelperClient>) -> Self {
        Self { system, helper }
    }
}

/// Errors surfaced by check execution.
///
/// A check returning an error counts as failed for aggregation; the runner
/// logs it and keeps going.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    /// A host probe failed in a way the check could not absorb.
    #[error(transparent)]
    System(#[from] SystemError),

    /// Delegation to the privileged helper failed.
    #[error(transparent)]
    Helper(#[from] HelperError),
}

/// A single, independently runnable audit check with a stable identity.
///
/// The UUID is the only cross-run key. Names and messages may vary by
/// version or locale and must never be used to identify a check.
#[async_trait]
pub trait Check: Send {
    /// Human-readable name.
    fn name(&self) -> &'static str;

    /// Stable identity. Opaque, globally unique, never reused.
    fn uuid(&self) -> &'static str;

    /// Whether the check can be evaluated right now.
    ///
    /// Distinct from pass/fail: a non-runnable check is excluded from
    /// aggregation entirely. Implementations may record the reason in
    /// their status.
    async fn is_runnable(&mut self, ctx: &CheckContext) -> bool;

    /// Whether the check needs elevated rights to produce a result.
    fn requires_root(&self) -> bool {
        false
    }

    /// Evaluate the check, updating its pass/fail outcome.
    ///
    /// Root-requiring checks running without root delegate to the helper
    /// here instead of probing the host directly.
    async fn run(&mut self, ctx: &CheckContext) -> Result<(), CheckError>;

    /// Outcome of the most recent [`Check::run`].
    fn passed(&self) -> bool;

    /// Fixed message shown when the check passes.
    fn passed_message(&self) -> &'static str;

    /// Fixed message shown when the check fails.
    fn failed_message(&self) -> &'static str;

    /// Current human-readable status line.
    fn status(&self) -> String;
}
