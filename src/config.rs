use std::collections::HashSet;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{trace, warn};

/// Storage backend configuration
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory alert store (no persistence)
    #[serde(rename = "none")]
    None,

    /// SQLite database (default for most deployments)
    Sqlite {
        /// Path to the SQLite database file
        #[serde(default = "default_sqlite_path")]
        path: PathBuf,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Sqlite {
            path: default_sqlite_path(),
        }
    }
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("./alerts.db")
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,

    #[serde(default)]
    pub services: Vec<ServiceConfig>,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Storage configuration (optional - defaults to SQLite)
    pub storage: Option<StorageConfig>,
}

/// A device checked for reachability
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct DeviceConfig {
    pub id: String,
    pub ip: IpAddr,
    pub name: String,
}

/// A service checked at protocol level
///
/// `protocol` stays a plain string so that unknown protocols survive config
/// loading and get skipped by the scheduler instead of failing startup.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    pub device_id: String,
    pub protocol: String,
    pub ip: IpAddr,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct SchedulerConfig {
    /// Candidate delays between rounds, one is picked at random each time
    #[serde(default = "default_intervals")]
    pub intervals: Vec<u64>,

    /// Upper bound for a single probe
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout: u64,

    /// Inactivity after which a tracked problem is dropped from memory
    #[serde(default = "default_problem_expiration")]
    pub problem_expiration: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            intervals: default_intervals(),
            probe_timeout: default_probe_timeout(),
            problem_expiration: default_problem_expiration(),
        }
    }
}

impl SchedulerConfig {
    pub fn interval_durations(&self) -> Vec<Duration> {
        self.intervals
            .iter()
            .map(|secs| Duration::from_secs(*secs))
            .collect()
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout)
    }

    /// `None` when the value does not fit a `chrono::Duration`
    pub fn try_problem_expiration(&self) -> Option<chrono::Duration> {
        i64::try_from(self.problem_expiration)
            .ok()
            .and_then(chrono::Duration::try_seconds)
    }

    pub fn problem_expiration(&self) -> chrono::Duration {
        self.try_problem_expiration().unwrap_or(chrono::Duration::MAX)
    }
}

fn default_intervals() -> Vec<u64> {
    vec![10, 15, 30]
}

fn default_probe_timeout() -> u64 {
    5
}

fn default_problem_expiration() -> u64 {
    30 * 60
}

impl Config {
    /// Reject configurations the monitor cannot run with
    ///
    /// Services pointing at unknown devices are allowed (the alert simply
    /// carries that device id) but logged.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.scheduler.intervals.is_empty() {
            anyhow::bail!("scheduler.intervals must contain at least one delay");
        }
        if self.scheduler.intervals.contains(&0) {
            anyhow::bail!("scheduler.intervals must not contain a zero delay");
        }
        if self.scheduler.probe_timeout == 0 {
            anyhow::bail!("scheduler.probe_timeout must be positive");
        }
        if self.scheduler.try_problem_expiration().is_none() {
            anyhow::bail!(
                "scheduler.problem_expiration of {}s is out of range",
                self.scheduler.problem_expiration
            );
        }

        let mut ids = HashSet::new();
        for device in &self.devices {
            if device.id.trim().is_empty() {
                anyhow::bail!("device with ip {} has an empty id", device.ip);
            }
            if !ids.insert(device.id.as_str()) {
                anyhow::bail!("duplicate device id '{}'", device.id);
            }
        }

        for service in &self.services {
            if service.device_id.trim().is_empty() {
                anyhow::bail!("service on {} has an empty deviceId", service.ip);
            }
            if !ids.contains(service.device_id.as_str()) {
                warn!(
                    "service {}:{} references unknown device '{}'",
                    service.ip, service.port, service.device_id
                );
            }
        }

        Ok(())
    }
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    parse_config(&file_content)
}

pub fn parse_config(content: &str) -> anyhow::Result<Config> {
    let config: Config = serde_json::from_str(content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))?;
    config.validate()?;
    trace!("loaded config: {config:?}");
    Ok(config)
}
