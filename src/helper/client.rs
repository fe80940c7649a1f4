//! Client side of the privileged helper protocol.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tracing::debug;

use super::limiter::CallLimiter;
use super::HelperRequest;

/// Failures while requesting a privileged result.
///
/// None of these are retried; the requesting check turns them into its own
/// failed or unknown outcome.
#[derive(Debug, thiserror::Error)]
pub enum HelperError {
    /// Could not connect to the helper socket.
    #[error("failed to connect to helper socket {path}: {source}")]
    Connect {
        /// Socket path dialed.
        path: PathBuf,
        /// Underlying connect failure.
        #[source]
        source: std::io::Error,
    },

    /// Could not encode the request envelope.
    #[error("failed to encode helper request: {0}")]
    Encode(#[source] serde_json::Error),

    /// Could not write the request to the socket.
    #[error("failed to send helper request: {0}")]
    Send(#[source] std::io::Error),

    /// Could not read the reply from the socket.
    #[error("failed to read helper response: {0}")]
    Receive(#[source] std::io::Error),

    /// The reply was not the expected JSON map.
    #[error("helper response is not valid JSON: {0}")]
    Decode(#[source] serde_json::Error),

    /// The reply map has no entry for the requested UUID.
    ///
    /// Deliberately an error rather than a default `false`: a helper that
    /// answers for the wrong check is a protocol bug worth surfacing.
    #[error("helper response is missing an entry for {uuid}")]
    MissingResult {
        /// UUID the request asked about.
        uuid: String,
    },
}

/// Connects to the privileged helper and requests single check results.
///
/// Outbound calls are rate limited to one per second (burst of one);
/// callers over the ceiling block until a slot frees up.
pub struct HelperClient {
    socket_path: PathBuf,
    limiter: CallLimiter,
}

impl HelperClient {
    /// Create a client for the helper socket at `socket_path`.
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            limiter: CallLimiter::new(Duration::from_secs(1)),
        }
    }

    /// Socket path this client dials.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Ask the helper to evaluate the check identified by `uuid` with
    /// elevated rights and return its pass/fail outcome.
    ///
    /// One connection and one round trip per call.
    ///
    /// # Errors
    ///
    /// Returns [`HelperError`] on connect, encode, send, receive, or
    /// decode failure, or when the reply lacks the requested UUID.
    pub async fn request(&self, uuid: &str) -> Result<bool, HelperError> {
        self.limiter.acquire().await;
        debug!(uuid, "requesting check result from the root helper");

        let mut stream =
            UnixStream::connect(&self.socket_path)
                .await
                .map_err(|source| HelperError::Connect {
                    path: self.socket_path.clone(),
                    source,
                })?;

        let mut payload = serde_json::to_vec(&HelperRequest {
            uuid: uuid.to_owned(),
        })
        .map_err(HelperError::Encode)?;
        payload.push(b'\n');
        stream.write_all(&payload).await.map_err(HelperError::Send)?;

        let mut line = String::new();
        let mut reader = BufReader::new(stream);
        reader
            .read_line(&mut line)
            .await
            .map_err(HelperError::Receive)?;

        let status: HashMap<String, bool> =
            serde_json::from_str(&line).map_err(HelperError::Decode)?;
        debug!(?status, "received status from the root helper");

        status
            .get(uuid)
            .copied()
            .ok_or_else(|| HelperError::MissingResult {
                uuid: uuid.to_owned(),
            })
    }
}
