//! Privilege separation over a Unix domain socket.
//!
//! An unprivileged process asks a separate, already-privileged helper
//! process to evaluate one root-only check by UUID. One newline-delimited
//! JSON request and one reply per connection; filesystem permissions on
//! the socket path are the only authentication.

use serde::{Deserialize, Serialize};

use crate::system::System;

pub mod client;
pub mod limiter;
pub mod server;

pub use client::{HelperClient, HelperError};

/// One request envelope: the UUID of the check to evaluate.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct HelperRequest {
    pub uuid: String,
}

/// Whether the helper socket service is registered with the init system.
///
/// Root-requiring checks call this from their runnability predicate so an
/// absent helper marks them not-runnable instead of erroring at run time.
pub async fn is_service_present(system: &dyn System) -> bool {
    system
        .run_command("systemctl", &["is-enabled", "--quiet", "vigil-helper.socket"])
        .await
        .is_ok()
}
