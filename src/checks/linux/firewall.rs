//! Host firewall check: ufw, firewalld, or raw iptables rules.

use async_trait::async_trait;
use tracing::debug;

use crate::check::{Check, CheckContext, CheckError};
use crate::helper;
use crate::system::System;

/// Verifies that some host firewall is active.
///
/// Needs root to inspect iptables, so unprivileged runs delegate to the
/// helper process.
#[derive(Debug, Default)]
pub struct Firewall {
    passed: bool,
    status: String,
}

impl Firewall {
    /// Create the check with no recorded outcome.
    pub fn new() -> Self {
        Self::default()
    }

    async fn ufw_active(&self, system: &dyn System) -> bool {
        match system.run_command("ufw", &["status"]).await {
            Ok(output) => {
                debug!(output = %output.trim_end(), "ufw status");
                output.contains("Status: active")
            }
            Err(e) => {
                debug!(error = %e, "could not query ufw");
                false
            }
        }
    }

    async fn firewalld_active(&self, system: &dyn System) -> bool {
        match system
            .run_command("systemctl", &["is-active", "firewalld"])
            .await
        {
            Ok(output) => {
                debug!(output = %output.trim_end(), "firewalld status");
                output.trim() == "active"
            }
            Err(e) => {
                debug!(error = %e, "could not query firewalld");
                false
            }
        }
    }

    async fn iptables_active(&self, system: &dyn System) -> bool {
        let output = match system
            .run_command("iptables", &["-L", "INPUT", "--line-numbers"])
            .await
        {
            Ok(output) => output,
            Err(e) => {
                debug!(error = %e, "could not query iptables");
                return false;
            }
        };

        // Numbered rule lines carry at least number, target, protocol,
        // options, source, and destination columns.
        let rules = output
            .lines()
            .filter(|line| {
                let fields: Vec<&str> = line.split_whitespace().collect();
                fields.len() >= 6 && fields[0].parse::<u32>().is_ok()
            })
            .count();
        debug!(rules, "iptables INPUT rules");
        rules > 0
    }

    async fn firewall_tooling_present(&mut self, system: &dyn System) -> bool {
        for tool in ["ufw", "firewalld", "iptables"] {
            if system.binary_exists(tool).await {
                return true;
            }
        }
        self.status = "Neither ufw, firewalld nor iptables are present, check cannot run".to_owned();
        false
    }
}

#[async_trait]
impl Check for Firewall {
    fn name(&self) -> &'static str {
        "Firewall is on"
    }

    fn uuid(&self) -> &'static str {
        "2e46c89a-5461-4865-a92e-3b799c12034a"
    }

    async fn is_runnable(&mut self, ctx: &CheckContext) -> bool {
        if !ctx.system.is_root() && !helper::is_service_present(ctx.system.as_ref()).await {
            self.status = "Root helper is not available, check cannot run".to_owned();
            return false;
        }
        self.firewall_tooling_present(ctx.system.as_ref()).await
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

        debug!(check = self.name(), "running check directly");
        self.passed = self.ufw_active(ctx.system.as_ref()).await
            || self.firewalld_active(ctx.system.as_ref()).await
            || self.iptables_active(ctx.system.as_ref()).await;
        Ok(())
    }

    fn passed(&self) -> bool {
        self.passed
    }

    fn passed_message(&self) -> &'static str {
        "Firewall is on"
    }

    fn failed_message(&self) -> &'static str {
        "Firewall is off"
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
