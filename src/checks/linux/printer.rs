//! Printer sharing check: CUPS reachable from the network.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::debug;

use crate::check::{Check, CheckContext, CheckError};

/// Print services and the TCP ports they expose.
const PRINT_SERVICES: [(u16, &str); 1] = [(631, "CUPS")];

/// Verifies that no print service is exposed on the network.
#[derive(Debug, Default)]
pub struct PrinterSharing {
    passed: bool,
    open_ports: BTreeMap<u16, &'static str>,
}

impl PrinterSharing {
    /// Create the check with no recorded outcome.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Check for PrinterSharing {
    fn name(&self) -> &'static str {
        "Sharing printers is off"
    }

    fn uuid(&self) -> &'static str {
        "b96524e0-150b-4bb8-abc7-517051b6c14e"
    }

    async fn is_runnable(&mut self, _ctx: &CheckContext) -> bool {
        true
    }

    async fn run(&mut self, ctx: &CheckContext) -> Result<(), CheckError> {
        self.passed = true;
        self.open_ports.clear();

        for (port, service) in PRINT_SERVICES {
            if ctx.system.port_open(port).await {
                debug!(check = self.name(), port, service, "print service port open");
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
        "Sharing printers is off"
    }

    fn failed_message(&self) -> &'static str {
        "Sharing printers is on"
    }

    fn status(&self) -> String {
        if self.passed {
            return self.passed_message().to_owned();
        }
        let mut msg = String::from("Print services found running on ports:");
        for (port, service) in &self.open_ports {
            msg.push_str(&format!(" {service}({port})"));
        }
        msg
    }
}
