//! Mapping from probe verdicts to alert conditions
//!
//! Each verdict is translated into a [`FaultPlan`]: at most one condition
//! that is failing right now, the conditions that this verdict proves
//! cleared, and optionally a family of stale alerts to supersede.
//!
//! | target  | outcome               | failing                         | cleared      |
//! |---------|-----------------------|---------------------------------|--------------|
//! | device  | unreachable           | connectivity/icmp/critical      |              |
//! | device  | healthy               |                                 | offline      |
//! | service | unreachable           | protocol/<p>/critical           |              |
//! | service | status N              | protocol/<p>/major ("returned") | unreachable  |
//! | service | healthy               |                                 | unreachable  |
//!
//! Status alerts carry the code in their message, so a healthy verdict or a
//! different code cannot name them exactly. They are cleared as a family
//! instead (see [`Supersede`]).

use crate::alerts::{AlertProtocol, AlertType, Fingerprint, NewAlert, Severity};
use crate::config::{DeviceConfig, ServiceConfig};
use crate::monitors::{ProbeOutcome, ProbeVerdict};

/// A concrete alert condition, as reported to the lifecycle manager
#[derive(Debug, Clone, PartialEq)]
pub struct FaultCondition {
    pub device_id: String,
    pub device_name: Option<String>,
    pub alert_type: AlertType,
    pub protocol: Option<AlertProtocol>,
    pub severity: Severity,
    pub message: String,
}

impl FaultCondition {
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint {
            device_id: self.device_id.clone(),
            alert_type: self.alert_type,
            protocol: self.protocol,
            message: self.message.clone(),
        }
    }

    pub fn to_new_alert(&self, details: serde_json::Value) -> NewAlert {
        NewAlert {
            device_id: self.device_id.clone(),
            device_name: self.device_name.clone(),
            alert_type: self.alert_type,
            protocol: self.protocol,
            severity: self.severity,
            message: self.message.clone(),
            details,
        }
    }
}

/// Open alerts of one device whose message starts with a common prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultFamily {
    pub device_id: String,
    pub alert_type: AlertType,
    pub protocol: Option<AlertProtocol>,
    pub message_prefix: String,
}

impl FaultFamily {
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        fingerprint.device_id == self.device_id
            && fingerprint.alert_type == self.alert_type
            && fingerprint.protocol == self.protocol
            && fingerprint.message.starts_with(&self.message_prefix)
    }
}

/// Resolve every open alert of `family` except the one with message `keep`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Supersede {
    pub family: FaultFamily,
    pub keep: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FaultPlan {
    pub failing: Option<FaultCondition>,
    pub cleared: Vec<FaultCondition>,
    pub supersede: Option<Supersede>,
}

pub fn offline_message(device: &DeviceConfig) -> String {
    format!("{} ({}) is offline", device.name, device.ip)
}

fn service_label(protocol: &str) -> String {
    protocol.to_ascii_uppercase()
}

pub fn unreachable_message(service: &ServiceConfig) -> String {
    format!(
        "{} service on {} is unreachable",
        service_label(&service.protocol),
        endpoint(service)
    )
}

pub fn status_message(service: &ServiceConfig, status: u16) -> String {
    format!("{}{}", status_prefix(service), status)
}

fn status_prefix(service: &ServiceConfig) -> String {
    format!(
        "{} service on {} returned ",
        service_label(&service.protocol),
        endpoint(service)
    )
}

fn endpoint(service: &ServiceConfig) -> String {
    format!("{}:{}", service.ip, service.port)
}

/// Plan for a device reachability verdict
pub fn plan_for_device(device: &DeviceConfig, verdict: &ProbeVerdict) -> FaultPlan {
    let offline = FaultCondition {
        device_id: device.id.clone(),
        device_name: Some(device.name.clone()),
        alert_type: AlertType::Connectivity,
        protocol: Some(AlertProtocol::Icmp),
        severity: Severity::Critical,
        message: offline_message(device),
    };

    if verdict.ok() {
        FaultPlan {
            cleared: vec![offline],
            ..Default::default()
        }
    } else {
        FaultPlan {
            failing: Some(offline),
            ..Default::default()
        }
    }
}

/// Plan for a service verdict
///
/// `device_name` is attached to new alerts when the service's device is known.
pub fn plan_for_service(
    service: &ServiceConfig,
    protocol: AlertProtocol,
    device_name: Option<&str>,
    verdict: &ProbeVerdict,
) -> FaultPlan {
    let condition = |severity, message| FaultCondition {
        device_id: service.device_id.clone(),
        device_name: device_name.map(str::to_string),
        alert_type: AlertType::Protocol,
        protocol: Some(protocol),
        severity,
        message,
    };

    let unreachable = condition(Severity::Critical, unreachable_message(service));
    let status_family = FaultFamily {
        device_id: service.device_id.clone(),
        alert_type: AlertType::Protocol,
        protocol: Some(protocol),
        message_prefix: status_prefix(service),
    };

    match verdict.outcome {
        ProbeOutcome::Healthy => FaultPlan {
            failing: None,
            cleared: vec![unreachable],
            supersede: Some(Supersede {
                family: status_family,
                keep: None,
            }),
        },
        ProbeOutcome::UnexpectedStatus(status) => {
            let message = status_message(service, status);
            FaultPlan {
                failing: Some(condition(Severity::Major, message.clone())),
                cleared: vec![unreachable],
                supersede: Some(Supersede {
                    family: status_family,
                    keep: Some(message),
                }),
            }
        }
        ProbeOutcome::Unreachable => FaultPlan {
            failing: Some(unreachable),
            ..Default::default()
        },
    }
}
