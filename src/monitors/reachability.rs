//! Device reachability via the system `ping` utility
//!
//! One echo request per check (`ping -c 1 -W <secs>`). The child process is
//! additionally bounded by a tokio timeout and killed if it overruns, so a
//! stuck `ping` never stalls a monitoring round.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::process::Command;
use tracing::{debug, instrument, trace};

use super::{ProbeChecker, ProbeError, ProbeOutcome, ProbeTarget, ProbeVerdict};
use crate::alerts::AlertProtocol;

/// Grace period on top of the ping deadline before the child is killed
const PROCESS_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct ReachabilityChecker {
    program: String,
    timeout: Duration,
}

impl ReachabilityChecker {
    pub fn new(timeout: Duration) -> Self {
        Self {
            program: "ping".to_string(),
            timeout,
        }
    }

    /// Use another ping-compatible binary
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn args(&self, target: &ProbeTarget) -> Vec<String> {
        // -W takes whole seconds; never pass 0, which means "wait forever" on some systems
        let wait = self.timeout.as_secs().max(1);
        vec![
            "-c".to_string(),
            "1".to_string(),
            "-W".to_string(),
            wait.to_string(),
            target.ip.to_string(),
        ]
    }
}

#[async_trait]
impl ProbeChecker for ReachabilityChecker {
    fn protocol(&self) -> AlertProtocol {
        AlertProtocol::Icmp
    }

    #[instrument(skip(self), fields(target = %target))]
    async fn check(&self, target: &ProbeTarget) -> Result<ProbeVerdict, ProbeError> {
        let child = Command::new(&self.program)
            .args(self.args(target))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = match tokio::time::timeout(self.timeout + PROCESS_GRACE, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                debug!("ping to {} did not finish in time", target.ip);
                return Ok(ProbeVerdict::new(
                    ProbeOutcome::Unreachable,
                    json!({ "alive": false, "error": "ping timed out" }),
                ));
            }
        };

        let alive = output.status.success();
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        trace!("ping {} exited with {}", target.ip, output.status);

        let mut details = json!({ "alive": alive, "ping": stdout });
        if !output.stderr.is_empty() {
            details["stderr"] = json!(String::from_utf8_lossy(&output.stderr));
        }

        let outcome = if alive {
            ProbeOutcome::Healthy
        } else {
            ProbeOutcome::Unreachable
        };

        Ok(ProbeVerdict::new(outcome, details))
    }
}
