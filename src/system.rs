//! Host access behind an injectable seam.
//!
//! Checks never touch the machine directly. Commands, file reads, and
//! process facts all go through the [`System`] trait so tests substitute a
//! scripted implementation instead of mutating global mock state.

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

/// Errors produced by host probes.
#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    /// The program could not be started at all.
    #[error("failed to launch {program}: {source}")]
    Launch {
        /// Program that failed to start.
        program: String,
        /// Underlying launch failure.
        #[source]
        source: std::io::Error,
    },

    /// The program ran and exited with a non-zero status.
    #[error("{program} exited with status {code:?}")]
    NonZeroExit {
        /// Program that ran.
        program: String,
        /// Exit code, when the process was not killed by a signal.
        code: Option<i32>,
        /// Combined stdout and stderr captured from the run.
        output: String,
    },

    /// Reading a file failed.
    #[error("failed to read {path}: {source}")]
    ReadFile {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying read failure.
        #[source]
        source: std::io::Error,
    },

    /// The invoking user's home directory could not be resolved.
    #[error("home directory is not resolvable")]
    NoHome,
}

/// Host access used by checks and the helper availability probe.
#[async_trait]
pub trait System: Send + Sync {
    /// Run a command and return its combined stdout and stderr.
    ///
    /// A non-zero exit status is an error carrying the same combined
    /// output, so callers can branch on "ran cleanly" while still reading
    /// what the command printed.
    async fn run_command(&self, program: &str, args: &[&str]) -> Result<String, SystemError>;

    /// Whether `program` resolves to an executable on `PATH`.
    async fn binary_exists(&self, program: &str) -> bool;

    /// Read a file into a string.
    async fn read_file(&self, path: &Path) -> Result<String, SystemError>;

    /// File names (not paths) of the entries in `path`.
    async fn list_dir(&self, path: &Path) -> Result<Vec<String>, SystemError>;

    /// Whether `path` exists at all.
    async fn path_exists(&self, path: &Path) -> bool;

    /// The invoking user's home directory.
    fn home_dir(&self) -> Result<PathBuf, SystemError>;

    /// Whether the process runs with effective uid 0.
    fn is_root(&self) -> bool;

    /// Whether `port` accepts TCP connections on a non-loopback address of
    /// this machine. Services bound only to loopback do not count as
    /// exposed.
    async fn port_open(&self, port: u16) -> bool;
}

/// [`System`] implementation backed by the real host.
#[derive(Debug, Default)]
pub struct HostSystem;

impl HostSystem {
    /// Create a host-backed system seam.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl System for HostSystem {
    async fn run_command(&self, program: &str, args: &[&str]) -> Result<String, SystemError> {
        let output = tokio::process::Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|source| SystemError::Launch {
                program: program.to_owned(),
                source,
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.is_empty() {
            if !combined.is_empty() {
                combined.push('\n');
            }
            combined.push_str(&stderr);
        }

        debug!(
            cmd = %format!("{program} {}", args.join(" ")),
            status = %output.status,
            "command finished"
        );

        if output.status.success() {
            Ok(combined)
        } else {
            Err(SystemError::NonZeroExit {
                program: program.to_owned(),
                code: output.status.code(),
                output: combined,
            })
        }
    }

    async fn binary_exists(&self, program: &str) -> bool {
        let Some(paths) = std::env::var_os("PATH") else {
            return false;
        };
        std::env::split_paths(&paths).any(|dir| {
            let candidate = dir.join(program);
            candidate.is_file()
        })
    }

    async fn read_file(&self, path: &Path) -> Result<String, SystemError> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|source| SystemError::ReadFile {
                path: path.to_path_buf(),
                source,
            })
    }

    async fn list_dir(&self, path: &Path) -> Result<Vec<String>, SystemError> {
        let mut entries = tokio::fs::read_dir(path)
            .await
            .map_err(|source| SystemError::ReadFile {
                path: path.to_path_buf(),
                source,
            })?;
        let mut names = Vec::new();
        while let Some(entry) =
            entries
                .next_entry()
                .await
                .map_err(|source| SystemError::ReadFile {
                    path: path.to_path_buf(),
                    source,
                })?
        {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    async fn path_exists(&self, path: &Path) -> bool {
        tokio::fs::metadata(path).await.is_ok()
    }

    fn home_dir(&self) -> Result<PathBuf, SystemError> {
        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().to_path_buf())
            .ok_or(SystemError::NoHome)
    }

    fn is_root(&self) -> bool {
        effective_uid_is_zero()
    }

    async fn port_open(&self, port: u16) -> bool {
        for addr in non_loopback_addrs().await {
            let connect = tokio::net::TcpStream::connect((addr, port));
            match tokio::time::timeout(Duration::from_secs(1), connect).await {
                Ok(Ok(_conn)) => {
                    debug!(%addr, port, "port accepts connections");
                    return true;
                }
                Ok(Err(_)) | Err(_) => {}
            }
        }
        false
    }
}

/// Effective uid probe that stays inside `forbid(unsafe_code)`.
///
/// On Linux this parses `/proc/self/status`; elsewhere it falls back to
/// comparing the login name against `root`.
fn effective_uid_is_zero() -> bool {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            for line in status.lines() {
                if let Some(rest) = line.strip_prefix("Uid:") {
                    // Fields are real, effective, saved, filesystem uid.
                    let mut fields = rest.split_whitespace();
                    let _real = fields.next();
                    return fields.next() == Some("0");
                }
            }
        }
        false
    }

    #[cfg(not(target_os = "linux"))]
    {
        std::env::var("USER")
            .or_else(|_| std::env::var("LOGNAME"))
            .map(|user| user == "root")
            .unwrap_or(false)
    }
}

/// Resolve this machine's non-loopback addresses via its hostname.
async fn non_loopback_addrs() -> Vec<IpAddr> {
    let hostname = match std::fs::read_to_string("/proc/sys/kernel/hostname") {
        Ok(name) => name.trim().to_owned(),
        Err(_) => match std::env::var("HOSTNAME") {
            Ok(name) => name,
            Err(_) => return Vec::new(),
        },
    };
    if hostname.is_empty() {
        return Vec::new();
    }

    let addrs = match tokio::net::lookup_host((hostname.as_str(), 0)).await {
        Ok(addrs) => addrs
            .map(|sock| sock.ip())
            .filter(|ip| !ip.is_loopback())
            .collect(),
        Err(_) => Vec::new(),
    };
    addrs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_command_combines_output_and_flags_failure() {
        let system = HostSystem::new();

        let out = system
            .run_command("sh", &["-c", "echo out; echo err >&2"])
            .await
            .expect("command should run");
        assert!(out.contains("out"));
        assert!(out.contains("err"));

        let err = system
            .run_command("sh", &["-c", "echo nope; exit 3"])
            .await
            .expect_err("non-zero exit should error");
        match err {
            SystemError::NonZeroExit { code, output, .. } => {
                assert_eq!(code, Some(3));
                assert!(output.contains("nope"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn binary_exists_finds_sh() {
        let system = HostSystem::new();
        assert!(system.binary_exists("sh").await);
        assert!(!system.binary_exists("definitely-not-a-real-binary").await);
    }
}
