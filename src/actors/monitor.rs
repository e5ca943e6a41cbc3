//! MonitorActor - Probes every configured target in rounds
//!
//! ## State machine
//!
//! ```text
//! start ──▶ Running ──round done──▶ Idle ──random delay elapsed──▶ Running ...
//!                                    │
//!                                    └──Shutdown / handle dropped──▶ Stopped
//! ```
//!
//! The first round runs immediately. After each round the actor sleeps for
//! a delay picked at random from the configured intervals. Only one round is
//! ever in flight: commands are handled while idle, so a `RunNow` or
//! `Shutdown` sent mid-round waits for the round to finish.
//!
//! Within a round, devices are checked first, then services. A failure on
//! one target is logged and counted, and never stops the round.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use rand::seq::IndexedRandom;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, instrument, warn};

use super::messages::{MonitorCommand, RoundSummary, SchedulerState};
use crate::config::{Config, DeviceConfig, ServiceConfig};
use crate::faults::{self, FaultPlan};
use crate::lifecycle::{LifecycleManager, ReportOutcome};
use crate::monitors::{CheckerRegistry, ProbeTarget};

/// Checker used for device reachability
const DEVICE_PROTOCOL: &str = "icmp";

/// Used only if the interval list is somehow empty
const FALLBACK_DELAY: Duration = Duration::from_secs(10);

/// Actor that runs monitoring rounds
pub struct MonitorActor {
    devices: Vec<DeviceConfig>,
    services: Vec<ServiceConfig>,

    /// Device id -> display name, attached to service alerts
    device_names: HashMap<String, String>,

    intervals: Vec<Duration>,
    lifecycle: Arc<LifecycleManager>,
    checkers: CheckerRegistry,
    command_rx: mpsc::Receiver<MonitorCommand>,
    state_tx: watch::Sender<SchedulerState>,
}

impl MonitorActor {
    pub fn new(
        config: &Config,
        lifecycle: Arc<LifecycleManager>,
        checkers: CheckerRegistry,
        command_rx: mpsc::Receiver<MonitorCommand>,
        state_tx: watch::Sender<SchedulerState>,
    ) -> Self {
        let device_names = config
            .devices
            .iter()
            .map(|d| (d.id.clone(), d.name.clone()))
            .collect();

        Self {
            devices: config.devices.clone(),
            services: config.services.clone(),
            device_names,
            intervals: config.scheduler.interval_durations(),
            lifecycle,
            checkers,
            command_rx,
            state_tx,
        }
    }

    /// Run the actor's main loop
    pub async fn run(mut self) {
        info!(
            "starting monitor for {} devices and {} services",
            self.devices.len(),
            self.services.len()
        );

        'rounds: loop {
            let summary = self.run_round().await;
            debug!(?summary, "round finished");

            let delay = self.next_delay();
            debug!("next round in {}s", delay.as_secs());

            let sleep = tokio::time::sleep(delay);
            tokio::pin!(sleep);

            loop {
                tokio::select! {
                    _ = &mut sleep => break,

                    cmd = self.command_rx.recv() => match cmd {
                        Some(MonitorCommand::RunNow { respond_to }) => {
                            debug!("received RunNow command");
                            let summary = self.run_round().await;
                            let _ = respond_to.send(summary);
                        }
                        Some(MonitorCommand::Shutdown) => {
                            debug!("received shutdown command");
                            break 'rounds;
                        }
                        None => {
                            warn!("command channel closed, shutting down");
                            break 'rounds;
                        }
                    },
                }
            }
        }

        self.state_tx.send_replace(SchedulerState::Stopped);
        info!("monitor stopped");
    }

    fn next_delay(&self) -> Duration {
        self.intervals
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or(FALLBACK_DELAY)
    }

    #[instrument(skip(self))]
    async fn run_round(&self) -> RoundSummary {
        self.state_tx.send_replace(SchedulerState::Running);
        let mut summary = RoundSummary::default();

        for device in &self.devices {
            self.check_device(device, &mut summary).await;
        }

        for service in &self.services {
            self.check_service(service, &mut summary).await;
        }

        summary.expired = self.lifecycle.sweep_expired(Utc::now()).await;

        self.state_tx.send_replace(SchedulerState::Idle);
        summary
    }

    async fn check_device(&self, device: &DeviceConfig, summary: &mut RoundSummary) {
        let Some(checker) = self.checkers.get(DEVICE_PROTOCOL) else {
            warn!("no {DEVICE_PROTOCOL} checker registered, skipping device {}", device.id);
            summary.skipped += 1;
            return;
        };

        summary.devices_checked += 1;
        match checker.check(&ProbeTarget::host(device.ip)).await {
            Ok(verdict) => {
                let plan = faults::plan_for_device(device, &verdict);
                self.apply(plan, verdict.details, summary).await;
            }
            Err(e) => {
                error!("failed to check device {} ({}): {e}", device.id, device.ip);
                summary.errors += 1;
            }
        }
    }

    async fn check_service(&self, service: &ServiceConfig, summary: &mut RoundSummary) {
        let Some(checker) = self.checkers.get(&service.protocol) else {
            warn!(
                "no checker for protocol '{}', skipping service on {}",
                service.protocol, service.ip
            );
            summary.skipped += 1;
            return;
        };

        summary.services_checked += 1;
        let target = ProbeTarget::endpoint(service.ip, Some(service.port));
        match checker.check(&target).await {
            Ok(verdict) => {
                let device_name = self.device_names.get(&service.device_id).map(String::as_str);
                let plan = faults::plan_for_service(service, checker.protocol(), device_name, &verdict);
                self.apply(plan, verdict.details, summary).await;
            }
            Err(e) => {
                error!("failed to check {} service on {target}: {e}", service.protocol);
                summary.errors += 1;
            }
        }
    }

    /// Feed a fault plan to the lifecycle manager, one alert operation at a time
    async fn apply(&self, plan: FaultPlan, details: serde_json::Value, summary: &mut RoundSummary) {
        if let Some(condition) = &plan.failing {
            match self.lifecycle.report(false, condition, details).await {
                Ok(ReportOutcome::Opened(_)) => summary.opened += 1,
                Ok(_) => {}
                Err(e) => {
                    error!("failed to record fault '{}': {e}", condition.message);
                    summary.errors += 1;
                }
            }
        }

        for condition in &plan.cleared {
            match self.lifecycle.report(true, condition, serde_json::Value::Null).await {
                Ok(ReportOutcome::Resolved(_)) => summary.resolved += 1,
                Ok(_) => {}
                Err(e) => {
                    error!("failed to resolve '{}': {e}", condition.message);
                    summary.errors += 1;
                }
            }
        }

        if let Some(supersede) = &plan.supersede {
            match self.lifecycle.resolve_superseded(supersede).await {
                Ok(resolved) => summary.resolved += resolved.len(),
                Err(e) => {
                    error!(
                        "failed to resolve superseded alerts of device {}: {e}",
                        supersede.family.device_id
                    );
                    summary.errors += 1;
                }
            }
        }
    }
}

/// Handle for controlling a MonitorActor
#[derive(Clone)]
pub struct MonitorHandle {
    sender: mpsc::Sender<MonitorCommand>,
    state_rx: watch::Receiver<SchedulerState>,
    device_count: usize,
    service_count: usize,
}

impl MonitorHandle {
    /// Spawn a new monitor actor; its first round starts right away
    pub fn spawn(config: &Config, lifecycle: Arc<LifecycleManager>, checkers: CheckerRegistry) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (state_tx, state_rx) = watch::channel(SchedulerState::Idle);

        let actor = MonitorActor::new(config, lifecycle, checkers, cmd_rx, state_tx);
        tokio::spawn(actor.run());

        Self {
            sender: cmd_tx,
            state_rx,
            device_count: config.devices.len(),
            service_count: config.services.len(),
        }
    }

    /// Run a round now and wait for its summary
    pub async fn run_now(&self) -> Result<RoundSummary> {
        let (tx, rx) = oneshot::channel();
        self.sender.send(MonitorCommand::RunNow { respond_to: tx }).await?;
        Ok(rx.await?)
    }

    pub fn state(&self) -> SchedulerState {
        *self.state_rx.borrow()
    }

    /// Stop the monitor, waiting for an in-flight round to finish
    pub async fn shutdown(self) {
        let _ = self.sender.send(MonitorCommand::Shutdown).await;
        let mut state_rx = self.state_rx.clone();
        let _ = state_rx.wait_for(|state| *state == SchedulerState::Stopped).await;
    }

    pub fn device_count(&self) -> usize {
        self.device_count
    }

    pub fn service_count(&self) -> usize {
        self.service_count
    }
}

// ============================================================================
// Tests
// ============================================================================
