//! Server side of the privileged helper protocol.
//!
//! Runs inside the root helper process. Each connection carries exactly
//! one request; the server validates the UUID shape, finds the matching
//! root-only check in the claim tables, evaluates it locally, and replies
//! with `{uuid: passed}`. Unknown or non-root UUIDs get an empty map, so a
//! caller cannot use the helper to execute arbitrary check logic beyond
//! the audited root set.

use std::collections::HashMap;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{info, warn};
use uuid::Uuid;

use crate::check::{Check, CheckContext};
use crate::claims;

use super::HelperRequest;

/// Accept and serve helper requests until the listener fails.
///
/// Connections are handled concurrently; each one is independent and
/// short-lived.
///
/// # Errors
///
/// Returns the accept-loop I/O error that stopped the server.
pub async fn run(listener: UnixListener, ctx: std::sync::Arc<CheckContext>) -> std::io::Result<()> {
    info!("helper server listening");
    loop {
        let (stream, _addr) = listener.accept().await?;
        let ctx = std::sync::Arc::clone(&ctx);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, &ctx).await {
                warn!(error = %e, "helper connection failed");
            }
        });
    }
}

/// Serve one request/reply exchange on an accepted connection.
async fn handle_connection(stream: UnixStream, ctx: &CheckContext) -> std::io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();

    let mut line = String::new();
    BufReader::new(read_half).read_line(&mut line).await?;

    let mut response: HashMap<String, bool> = HashMap::new();
    match serde_json::from_str::<HelperRequest>(&line) {
        Ok(request) if Uuid::parse_str(&request.uuid).is_ok() => {
            match find_root_check(&request.uuid) {
                Some(mut check) => {
                    info!(uuid = %request.uuid, check = check.name(), "running privileged check");
                    if let Err(e) = check.run(ctx).await {
                        // Same taxonomy as the runner: an execution error
                        // counts as a failed check, not a dropped reply.
                        warn!(uuid = %request.uuid, error = %e, "privileged check failed to run");
                    }
                    response.insert(request.uuid, check.passed());
                }
                None => {
                    warn!(uuid = %request.uuid, "unknown or non-root check requested");
                }
            }
        }
        Ok(request) => {
            warn!(uuid = %request.uuid, "malformed check UUID in helper request");
        }
        Err(e) => {
            warn!(error = %e, "malformed helper request");
        }
    }

    let mut payload = serde_json::to_vec(&response).map_err(std::io::Error::other)?;
    payload.push(b'\n');
    write_half.write_all(&payload).await
}

/// Look up a root-requiring check by UUID across the claim tables.
///
/// Returns a fresh instance; check state never leaks between requests.
fn find_root_check(uuid: &str) -> Option<Box<dyn Check>> {
    claims::all()
        .into_iter()
        .flat_map(|claim| claim.checks)
        .find(|check| check.uuid() == uuid && check.requires_root())
}
