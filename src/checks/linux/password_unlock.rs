//! Screen lock policy check for GNOME and KDE sessions.

use async_trait::async_trait;
use tracing::debug;

use crate::check::{Check, CheckContext, CheckError};
use crate::system::System;

/// Verifies that unlocking the screen requires a password.
///
/// Probes whichever desktop environments are installed; passes only when
/// at least one was probed and every probed one locks.
#[derive(Debug, Default)]
pub struct PasswordToUnlock {
    passed: bool,
}

impl PasswordToUnlock {
    /// Create the check with no recorded outcome.
    pub fn new() -> Self {
        Self::default()
    }

    async fn gnome_locks(&self, system: &dyn System) -> bool {
        match system
            .run_command(
                "gsettings",
                &["get", "org.gnome.desktop.screensaver", "lock-enabled"],
            )
            .await
        {
            Ok(output) => {
                let locks = output.trim() == "true";
                debug!(setting = %output.trim(), locks, "GNOME screensaver lock");
                locks
            }
            Err(e) => {
                debug!(error = %e, "could not read GNOME screensaver settings");
                false
            }
        }
    }

    async fn kde_locks(&self, system: &dyn System) -> bool {
        match system
            .run_command(
                "kreadconfig5",
                &[
                    "--file",
                    "kscreenlockerrc",
                    "--group",
                    "Daemon",
                    "--key",
                    "Autolock",
                ],
            )
            .await
        {
            Ok(output) => {
                let locks = output.trim() == "true";
                debug!(setting = %output.trim(), locks, "KDE screen locker");
                locks
            }
            Err(e) => {
                debug!(error = %e, "could not read KDE screen locker settings");
                false
            }
        }
    }
}

#[async_trait]
impl Check for PasswordToUnlock {
    fn name(&self) -> &'static str {
        "Password is required to unlock the screen"
    }

    fn uuid(&self) -> &'static str {
        "37dee029-605b-4aab-96b9-5438e5aa44d8"
    }

    async fn is_runnable(&mut self, _ctx: &CheckContext) -> bool {
        true
    }

    async fn run(&mut self, ctx: &CheckContext) -> Result<(), CheckError> {
        let mut any_probed = false;
        let mut all_lock = true;

        if ctx.system.binary_exists("gsettings").await {
            any_probed = true;
            all_lock = all_lock && self.gnome_locks(ctx.system.as_ref()).await;
        } else {
            debug!("GNOME environment not detected for screen lock check");
        }

        if ctx.system.binary_exists("kreadconfig5").await {
            any_probed = true;
            all_lock = all_lock && self.kde_locks(ctx.system.as_ref()).await;
        } else {
            debug!("KDE environment not detected for screen lock check");
        }

        self.passed = any_probed && all_lock;
        Ok(())
    }

    fn passed(&self) -> bool {
        self.passed
    }

    fn passed_message(&self) -> &'static str {
        "Password after sleep or screensaver is on"
    }

    fn failed_message(&self) -> &'static str {
        "Password after sleep or screensaver is off"
    }

    fn status(&self) -> String {
        if self.passed {
            self.passed_message().to_owned()
        } else {
            self.failed_message().to_owned()
        }
    }
}
