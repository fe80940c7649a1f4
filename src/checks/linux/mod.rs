//! Checks specific to Linux desktops and servers.

mod encrypting_fs;
mod firewall;
mod password_unlock;
mod printer;

pub use encrypting_fs::EncryptingFs;
pub use firewall::Firewall;
pub use password_unlock::PasswordToUnlock;
pub use printer::PrinterSharing;
