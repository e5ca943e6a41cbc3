//! Alert records
//!
//! An [`Alert`] is the persisted unit of fault state. The monitoring loop
//! creates one when a probe fails and no open alert with the same
//! [`Fingerprint`] exists, and resolves it once the condition clears.
//!
//! ## Invariant
//!
//! For a given fingerprint `(device_id, alert_type, protocol, message)` at most
//! one alert with `resolved == false` exists at any time. Resolved alerts with
//! the same fingerprint may pile up, each one being a separate fault episode.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

static ALERT_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-fA-F]{24}$").expect("static regex is valid"));

/// Category of a fault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Connectivity,
    Cpu,
    Memory,
    Interface,
    Protocol,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Connectivity => "connectivity",
            AlertType::Cpu => "cpu",
            AlertType::Memory => "memory",
            AlertType::Interface => "interface",
            AlertType::Protocol => "protocol",
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "connectivity" => Ok(AlertType::Connectivity),
            "cpu" => Ok(AlertType::Cpu),
            "memory" => Ok(AlertType::Memory),
            "interface" => Ok(AlertType::Interface),
            "protocol" => Ok(AlertType::Protocol),
            other => Err(format!("unknown alert type '{other}'")),
        }
    }
}

/// Probe mechanism that detected a fault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertProtocol {
    Icmp,
    Http,
    Snmp,
}

impl AlertProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertProtocol::Icmp => "icmp",
            AlertProtocol::Http => "http",
            AlertProtocol::Snmp => "snmp",
        }
    }
}

impl fmt::Display for AlertProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "icmp" => Ok(AlertProtocol::Icmp),
            "http" => Ok(AlertProtocol::Http),
            "snmp" => Ok(AlertProtocol::Snmp),
            other => Err(format!("unknown protocol '{other}'")),
        }
    }
}

/// Severity of a fault, most severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Major,
    Minor,
    Warning,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Major => "major",
            Severity::Minor => "minor",
            Severity::Warning => "warning",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "critical" => Ok(Severity::Critical),
            "major" => Ok(Severity::Major),
            "minor" => Ok(Severity::Minor),
            "warning" => Ok(Severity::Warning),
            other => Err(format!("unknown severity '{other}'")),
        }
    }
}

/// Identifier of an alert record
///
/// 24 hexadecimal characters: 4 bytes of big-endian Unix seconds followed by
/// 8 random bytes. Always stored and rendered in lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AlertId(String);

impl AlertId {
    /// Generate a fresh identifier for an alert created at `now`
    pub fn generate(now: DateTime<Utc>) -> Self {
        let seconds = now.timestamp().clamp(0, u32::MAX as i64) as u32;
        let random: [u8; 8] = rand::rng().random();

        let mut id = format!("{seconds:08x}");
        for byte in random {
            id.push_str(&format!("{byte:02x}"));
        }

        Self(id)
    }

    /// Parse a user-supplied identifier
    ///
    /// Returns `None` unless the input is exactly 24 hex characters.
    pub fn parse(raw: &str) -> Option<Self> {
        ALERT_ID_PATTERN
            .is_match(raw)
            .then(|| Self(raw.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for AlertId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for AlertId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        AlertId::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid alert id '{raw}'")))
    }
}

/// Identity of a distinct fault condition, used for deduplication
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    pub device_id: String,
    pub alert_type: AlertType,
    pub protocol: Option<AlertProtocol>,
    pub message: String,
}

impl Fingerprint {
    /// Key used by the in-memory problem tracker
    pub fn key(&self) -> String {
        format!(
            "{}-{}-{}-{}",
            self.device_id,
            self.alert_type,
            self.protocol.map(|p| p.as_str()).unwrap_or("none"),
            self.message
        )
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// A persisted alert record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    #[serde(rename = "_id")]
    pub id: AlertId,

    pub device_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,

    pub alert_type: AlertType,

    #[serde(default)]
    pub protocol: Option<AlertProtocol>,

    pub severity: Severity,

    pub message: String,

    #[serde(default)]
    pub resolved: bool,

    #[serde(default)]
    pub details: serde_json::Value,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Alert {
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint {
            device_id: self.device_id.clone(),
            alert_type: self.alert_type,
            protocol: self.protocol,
            message: self.message.clone(),
        }
    }

    pub fn is_open(&self) -> bool {
        !self.resolved
    }
}

/// Payload for creating an alert
///
/// This is both what the lifecycle manager hands to the store and what the
/// create endpoint accepts. New alerts always start unresolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAlert {
    pub device_id: String,

    #[serde(default)]
    pub device_name: Option<String>,

    pub alert_type: AlertType,

    #[serde(default)]
    pub protocol: Option<AlertProtocol>,

    pub severity: Severity,

    pub message: String,

    #[serde(default)]
    pub details: serde_json::Value,
}

impl NewAlert {
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint {
            device_id: self.device_id.clone(),
            alert_type: self.alert_type,
            protocol: self.protocol,
            message: self.message.clone(),
        }
    }

    /// Check required fields that serde alone cannot enforce
    pub fn validate(&self) -> Result<(), String> {
        if self.device_id.trim().is_empty() {
            return Err("deviceId is required".to_string());
        }
        if self.message.trim().is_empty() {
            return Err("message is required".to_string());
        }
        Ok(())
    }

    /// Materialize the record as it will be stored
    pub fn into_alert(self, now: DateTime<Utc>) -> Alert {
        Alert {
            id: AlertId::generate(now),
            device_id: self.device_id,
            device_name: self.device_name,
            alert_type: self.alert_type,
            protocol: self.protocol,
            severity: self.severity,
            message: self.message,
            resolved: false,
            details: self.details,
            created_at: now,
            updated_at: now,
        }
    }
}
