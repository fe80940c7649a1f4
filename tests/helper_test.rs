//! Tests for `src/helper/`: the protocol client, rate limiter, and server.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;

use vigil::check::CheckContext;
use vigil::helper::limiter::CallLimiter;
use vigil::helper::{HelperClient, HelperError};
use vigil::system::{System, SystemError};

// ---------------------------------------------------------------------------
// Canned single-shot server
// ---------------------------------------------------------------------------

/// Accept one connection, capture the request line, reply verbatim.
fn serve_once(listener: UnixListener, reply: &'static str) -> tokio::task::JoinHandle<String> {
    tokio::spawn(async move {
        let (stream, _addr) = listener.accept().await.expect("accept");
        let (read_half, mut write_half) = stream.into_split();
        let mut line = String::new();
        BufReader::new(read_half)
            .read_line(&mut line)
            .await
            .expect("read request");
        write_half
            .write_all(reply.as_bytes())
            .await
            .expect("write reply");
        line
    })
}

#[tokio::test]
async fn round_trip_returns_the_mapped_result() {
    let dir = tempfile::tempdir().expect("tempdir");
    let socket = dir.path().join("helper.sock");
    let listener = UnixListener::bind(&socket).expect("bind");
    let server = serve_once(listener, "{\"abc\": true}\n");

    let client = HelperClient::new(&socket);
    let passed = client.request("abc").await.expect("request should succeed");
    assert!(passed);

    let request_line = server.await.expect("server task");
    let request: HashMap<String, String> =
        serde_json::from_str(&request_line).expect("request is JSON");
    assert_eq!(request.get("uuid").map(String::as_str), Some("abc"));
}

#[tokio::test]
async fn reply_missing_the_requested_uuid_is_a_protocol_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let socket = dir.path().join("helper.sock");
    let listener = UnixListener::bind(&socket).expect("bind");
    let _server = serve_once(listener, "{}\n");

    let client = HelperClient::new(&socket);
    match client.request("abc").await {
        Err(HelperError::MissingResult { uuid }) => assert_eq!(uuid, "abc"),
        other => panic!("expected MissingResult, got {other:?}"),
    }
}

#[tokio::test]
async fn garbage_reply_is_a_decode_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let socket = dir.path().join("helper.sock");
    let listener = UnixListener::bind(&socket).expect("bind");
    let _server = serve_once(listener, "not json\n");

    let client = HelperClient::new(&socket);
    assert!(matches!(
        client.request("abc").await,
        Err(HelperError::Decode(_))
    ));
}

#[tokio::test]
async fn unreachable_socket_is_a_connect_error() {
    let client = HelperClient::new("/nonexistent/vigil.sock");
    assert!(matches!(
        client.request("abc").await,
        Err(HelperError::Connect { .. })
    ));
}

// ---------------------------------------------------------------------------
// Rate limiting
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn back_to_back_calls_are_at_least_one_interval_apart() {
    let limiter = CallLimiter::new(Duration::from_secs(1));
    let started = tokio::time::Instant::now();

    limiter.acquire().await;
    let first = started.elapsed();
    limiter.acquire().await;
    let second = started.elapsed();

    assert!(first < Duration::from_millis(10), "first call is immediate");
    assert!(
        second >= Duration::from_secs(1),
        "second call waited: {second:?}"
    );
}

// ---------------------------------------------------------------------------
// Server dispatch (Linux claim table)
// ---------------------------------------------------------------------------

/// Scripted system pretending to be a root host with an active ufw.
struct RootUfwSystem;

#[async_trait]
impl System for RootUfwSystem {
    async fn run_command(&self, program: &str, args: &[&str]) -> Result<String, SystemError> {
        if program == "ufw" && args == ["status"] {
            return Ok("Status: active\n".to_owned());
        }
        Err(SystemError::Launch {
            program: program.to_owned(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "fixture not found"),
        })
    }

    async fn binary_exists(&self, program: &str) -> bool {
        program == "ufw"
    }

    async fn read_file(&self, path: &Path) -> Result<String, SystemError> {
        Err(SystemError::ReadFile {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "fixture not found"),
        })
    }

    async fn list_dir(&self, path: &Path) -> Result<Vec<String>, SystemError> {
        Err(SystemError::ReadFile {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "fixture not found"),
        })
    }

    async fn path_exists(&self, _path: &Path) -> bool {
        false
    }

    fn home_dir(&self) -> Result<PathBuf, SystemError> {
        Err(SystemError::NoHome)
    }

    fn is_root(&self) -> bool {
        true
    }

    async fn port_open(&self, _port: u16) -> bool {
        false
    }
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn server_runs_a_root_check_and_replies_with_its_outcome() {
    const FIREWALL_UUID: &str = "2e46c89a-5461-4865-a92e-3b799c12034a";

    let dir = tempfile::tempdir().expect("tempdir");
    let socket = dir.path().join("helper.sock");
    let listener = UnixListener::bind(&socket).expect("bind");

    let ctx = Arc::new(CheckContext::new(
        Arc::new(RootUfwSystem),
        Arc::new(HelperClient::new(&socket)),
    ));
    let server = tokio::spawn(vigil::helper::server::run(listener, ctx));

    let client = HelperClient::new(&socket);
    let passed = client
        .request(FIREWALL_UUID)
        .await
        .expect("dispatch should succeed");
    assert!(passed);

    server.abort();
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn server_replies_with_an_empty_map_for_unknown_uuids() {
    let dir = tempfile::tempdir().expect("tempdir");
    let socket = dir.path().join("helper.sock");
    let listener = UnixListener::bind(&socket).expect("bind");

    let ctx = Arc::new(CheckContext::new(
        Arc::new(RootUfwSystem),
        Arc::new(HelperClient::new(&socket)),
    ));
    let server = tokio::spawn(vigil::helper::server::run(listener, ctx));

    let client = HelperClient::new(&socket);
    // Valid UUID shape, but not a known root check.
    match client.request("6a1b65f4-5325-4fc5-bd95-12f26ccd1745").await {
        Err(HelperError::MissingResult { .. }) => {}
        other => panic!("expected MissingResult, got {other:?}"),
    }

    server.abort();
}
