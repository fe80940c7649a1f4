//! Checks shared across all supported platforms.

mod remote_login;
mod ssh_keys;
mod ssh_keys_algo;

pub use remote_login::RemoteLogin;
pub use ssh_keys::SshKeys;
pub use ssh_keys_algo::SshKeysAlgo;
