//! Block device encryption check: LUKS mappings or kernel crypto boot
//! parameters.

use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use crate::check::{Check, CheckContext, CheckError};
use crate::helper;
use crate::system::System;

/// Verifies that the filesystem sits on an encrypted block device.
#[derive(Debug, Default)]
pub struct EncryptingFs {
    passed: bool,
    status: String,
}

impl EncryptingFs {
    /// Create the check with no recorded outcome.
    pub fn new() -> Self {
        Self::default()
    }

    async fn luks_mapping_present(&self, system: &dyn System) -> bool {
        let output = match system.run_command("lsblk", &["-o", "TYPE,MOUNTPOINT"]).await {
            Ok(output) => output,
            Err(e) => {
                debug!(error = %e, "could not run lsblk");
                return false;
            }
        };
        for line in output.lines() {
            if line.contains("crypt") {
                debug!(line, "LUKS mapping detected");
                return true;
            }
        }
        false
    }

    async fn kernel_cmdline_crypto(&self, system: &dyn System) -> bool {
        let cmdline = match system.read_file(Path::new("/proc/cmdline")).await {
            Ok(cmdline) => cmdline,
            Err(e) => {
                debug!(error = %e, "could not read kernel command line");
                return false;
            }
        };
        for param in cmdline.split_whitespace() {
            if let Some(spec) = param.strip_prefix("cryptdevice=") {
                let parts: Vec<&str> = spec.split(':').collect();
                if parts.len() == 3 && parts[2] == "root" {
                    debug!(param, "kernel crypto parameters detected");
                    return true;
                }
            }
        }
        false
    }
}

#[async_trait]
impl Check for EncryptingFs {
    fn name(&self) -> &'static str {
        "Filesystem encryption is enabled"
    }

    fn uuid(&self) -> &'static str {
        "21830a4e-84f1-48fe-9c5b-beab436b2cdb"
    }

    async fn is_runnable(&mut self, ctx: &CheckContext) -> bool {
        if !ctx.system.is_root() && !helper::is_service_present(ctx.system.as_ref()).await {
            self.status = "Root helper is not available, check cannot run".to_owned();
            return false;
        }
        true
    }

    fn requires_root(&self) -> bool {
        true
    }

    async fn run(&mut self, ctx: &CheckContext) -> Result<(), CheckError> {
        if self.requires_root() && !ctx.system.is_root() {
            debug!(check = self.name(), "running check via the root helper");
            self.passed = ctx.helper.request(self.uuid()).await?;
            return Ok(());
        }

        self.passed = self.luks_mapping_present(ctx.system.as_ref()).await
            || self.kernel_cmdline_crypto(ctx.system.as_ref()).await;
        Ok(())
    }

    fn passed(&self) -> bool {
        self.passed
    }

    fn passed_message(&self) -> &'static str {
        "Block device encryption is enabled"
    }

    fn failed_message(&self) -> &'static str {
        "Block device encryption is disabled"
    }

    fn status(&self) -> String {
        if self.passed {
            self.passed_message().to_owned()
        } else if self.status.is_empty() {
            self.failed_message().to_owned()
        } else {
            self.status.clone()
        }
    }
}
