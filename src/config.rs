//! Runtime path resolution.
//!
//! Vigil deliberately has no configuration file. Everything it needs to
//! find on disk is derived from the environment:
//! - `VIGIL_STATE_FILE`: the last-state cache file (default `~/.vigil.state`)
//! - `VIGIL_SOCKET`: the privileged helper socket (default `/run/vigil.sock`)
//! - `VIGIL_LOGS_DIR`: helper server logs (default `~/.vigil/logs`)

use std::path::PathBuf;

/// Resolved filesystem locations used across the process.
///
/// Created once at startup and passed by reference to the components that
/// need them; nothing reads these paths from ambient global state.
#[derive(Debug, Clone)]
pub struct RuntimePaths {
    /// Backing file for the [`crate::state::StateStore`].
    pub state_file: PathBuf,

    /// Unix socket the privileged helper listens on.
    pub helper_socket: PathBuf,

    /// Directory for the helper server's rotated log files.
    pub logs_dir: PathBuf,
}

/// Default helper socket path, shared with distribution packaging.
pub const DEFAULT_SOCKET_PATH: &str = "/run/vigil.sock";

/// Resolve all runtime paths from the environment.
///
/// Falls back to the current directory when the home directory cannot be
/// determined, so a misconfigured environment degrades to relative paths
/// instead of aborting the run.
pub fn runtime_paths() -> RuntimePaths {
    let home = directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));

    let state_file = std::env::var_os("VIGIL_STATE_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|| home.join(".vigil.state"));

    let helper_socket = std::env::var_os("VIGIL_SOCKET")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SOCKET_PATH));

    let logs_dir = std::env::var_os("VIGIL_LOGS_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| home.join(".vigil").join("logs"));

    RuntimePaths {
        state_file,
        helper_socket,
        logs_dir,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env vars are process global, so overrides and defaults are exercised
    // in a single test to avoid ordering races.
    #[test]
    fn env_overrides_take_precedence_over_defaults() {
        std::env::set_var("VIGIL_STATE_FILE", "/tmp/vigil-test.state");
        std::env::set_var("VIGIL_SOCKET", "/tmp/vigil-test.sock");
        let overridden = runtime_paths();

        std::env::remove_var("VIGIL_STATE_FILE");
        std::env::remove_var("VIGIL_SOCKET");
        let defaults = runtime_paths();

        assert_eq!(
            overridden.state_file,
            PathBuf::from("/tmp/vigil-test.state")
        );
        assert_eq!(
            overridden.helper_socket,
            PathBuf::from("/tmp/vigil-test.sock")
        );
        assert!(defaults.state_file.ends_with(".vigil.state"));
        assert_eq!(
            defaults.helper_socket,
            PathBuf::from(DEFAULT_SOCKET_PATH)
        );
    }
}
