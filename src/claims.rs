//! Claim tables: named groups of checks, built per target OS at startup.
//!
//! A claim is display grouping only; ordering within a claim is insertion
//! order and has no effect on execution.

use crate::check::Check;

/// A named grouping of checks.
pub struct Claim {
    /// Display title for the group.
    pub title: String,

    /// Checks in display order.
    pub checks: Vec<Box<dyn Check>>,
}

impl Claim {
    /// Build a claim over `checks`.
    pub fn new(title: impl Into<String>, checks: Vec<Box<dyn Check>>) -> Self {
        Self {
            title: title.into(),
            checks,
        }
    }
}

/// All claims for this target OS.
///
/// Fresh check instances every call; callers own the returned state.
#[cfg(target_os = "linux")]
pub fn all() -> Vec<Claim> {
    use crate::checks::{linux, shared};

    vec![
        Claim::new(
            "Access Security",
            vec![
                Box::new(linux::PasswordToUnlock::new()),
                Box::new(shared::SshKeys::new()),
                Box::new(shared::SshKeysAlgo::new()),
            ],
        ),
        Claim::new(
            "Firewall & Sharing",
            vec![
                Box::new(linux::Firewall::new()),
                Box::new(linux::PrinterSharing::new()),
                Box::new(shared::RemoteLogin::new()),
            ],
        ),
        Claim::new(
            "System Integrity",
            vec![Box::new(linux::EncryptingFs::new())],
        ),
    ]
}

/// All claims for this target OS.
///
/// Fresh check instances every call; callers own the returned state.
#[cfg(target_os = "macos")]
pub fn all() -> Vec<Claim> {
    use crate::checks::shared;

    // The macOS-specific checks are not ported yet; the shared table still
    // audits key hygiene and remote access exposure.
    vec![
        Claim::new(
            "Access Security",
            vec![
                Box::new(shared::SshKeys::new()),
                Box::new(shared::SshKeysAlgo::new()),
            ],
        ),
        Claim::new(
            "Firewall & Sharing",
            vec![Box::new(shared::RemoteLogin::new())],
        ),
    ]
}

/// All claims for this target OS.
///
/// Fresh check instances every call; callers own the returned state.
#[cfg(not(any(target_os = "linux", target_os = "macos")))]
pub fn all() -> Vec<Claim> {
    use crate::checks::shared;

    vec![
        Claim::new(
            "Access Security",
            vec![
                Box::new(shared::SshKeys::new()),
                Box::new(shared::SshKeysAlgo::new()),
            ],
        ),
        Claim::new(
            "Firewall & Sharing",
            vec![Box::new(shared::RemoteLogin::new())],
        ),
    ]
}
