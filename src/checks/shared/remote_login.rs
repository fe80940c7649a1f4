//! Remote login check: SSH, RDP, and VNC exposure.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::debug;

use crate::check::{Check, CheckContext, CheckError};

/// Remote access services and the TCP ports they listen on.
const REMOTE_SERVICES: [(u16, &str); 4] = [
    (22, "SSH"),
    (3389, "RDP"),
    (3390, "RDP"),
    (5900, "VNC"),
];

/// Verifies that no remote access service is reachable from the network.
#[derive(Debug, Default)]
pub struct RemoteLogin {
    passed: bool,
    open_ports: BTreeMap<u16, &'static str>,
}

impl RemoteLogin {
    /// Create the check with no recorded outcome.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Check for RemoteLogin {
    fn name(&self) -> &'static str {
        "Remote login is disabled"
    }

    fn uuid(&self) -> &'static str {
        "4ced961d-7cfc-4e7b-8f80-195f6379446e"
    }

    async fn is_runnable(&mut self, _ctx: &CheckContext) -> bool {
        true
    }

    async fn run(&mut self, ctx: &CheckContext) -> Result<(), CheckError> {
        self.passed = true;
        self.open_ports.clear();

        for (port, service) in REMOTE_SERVICES {
            if ctx.system.port_open(port).await {
                debug!(check = self.name(), port, service, "remote access service found");
                self.passed = false;
                self.open_ports.insert(port, service);
            }
        }
        Ok(())
    }

    fn passed(&self) -> bool {
        self.passed
    }

    fn passed_message(&self) -> &'static str {
        "No remote access services found running"
    }

    fn failed_message(&self) -> &'static str {
        "Remote access services found running"
    }

    fn status(&self) -> String {
        if self.passed {
            return self.passed_message().to_owned();
        }
        let mut msg = String::from("Remote access services found running on ports:");
        for (port, service) in &self.open_ports {
            msg.push_str(&format!(" {service}({port})"));
        }
        msg
    }
}
