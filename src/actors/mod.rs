//! Actor-based monitoring loop
//!
//! The monitor runs as an independent async task and is driven through a
//! cloneable handle that talks to it over a Tokio mpsc channel.
//!
//! ```text
//!   MonitorHandle ──commands──▶ MonitorActor
//!                                   │  one round, then a random delay
//!                                   ▼
//!                           CheckerRegistry (icmp, http, ...)
//!                                   │  ProbeVerdict
//!                                   ▼
//!                          faults::plan_for_*  ──▶  LifecycleManager ──▶ AlertStore
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: `MonitorCommand` over mpsc
//! 2. **Request/Response**: oneshot channels carried inside commands
//! 3. **State**: a watch channel publishes `SchedulerState` transitions

pub mod messages;
pub mod monitor;

pub use messages::{MonitorCommand, RoundSummary, SchedulerState};
pub use monitor::{MonitorActor, MonitorHandle};
