//! Message types for the monitor actor
//!
//! Commands travel over an mpsc channel; replies come back on a oneshot
//! channel carried inside the command.

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// Commands that can be sent to the MonitorActor
#[derive(Debug)]
pub enum MonitorCommand {
    /// Run a full round immediately, without waiting for the timer
    ///
    /// The pending delay is not reset. Used by tests and manual refreshes.
    RunNow {
        respond_to: oneshot::Sender<RoundSummary>,
    },

    /// Stop scheduling rounds
    ///
    /// A round in progress is allowed to finish first.
    Shutdown,
}

/// Whether the scheduler is waiting or probing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    /// Waiting for the next round
    Idle,

    /// A round is in progress
    Running,

    /// The actor has exited
    Stopped,
}

/// Counters collected over one monitoring round
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSummary {
    pub devices_checked: usize,
    pub services_checked: usize,

    /// Targets with no registered checker
    pub skipped: usize,

    /// Probe or alert operations that failed; the round went on regardless
    pub errors: usize,

    pub opened: usize,
    pub resolved: usize,

    /// Problem tracker entries dropped at the end of the round
    pub expired: usize,
}
