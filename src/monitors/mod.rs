//! Probe checkers
//!
//! A checker performs one bounded-time check of one target and returns a
//! [`ProbeVerdict`]. Network trouble (timeouts, refused connections,
//! unexpected status codes, silent hosts) is a normal verdict, never an
//! error. [`ProbeError`] is reserved for targets that cannot be probed at all
//! and for a checker that cannot run.
//!
//! Checkers are looked up by protocol name through a [`CheckerRegistry`].
//! Supporting a new protocol means implementing [`ProbeChecker`] and
//! registering it, plus a message/severity entry in [`crate::faults`].

pub mod http;
pub mod reachability;

use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::alerts::AlertProtocol;

pub use http::HttpChecker;
pub use reachability::ReachabilityChecker;

/// Where a probe is sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeTarget {
    pub ip: IpAddr,
    pub port: Option<u16>,
}

impl ProbeTarget {
    pub fn host(ip: IpAddr) -> Self {
        Self { ip, port: None }
    }

    pub fn endpoint(ip: IpAddr, port: Option<u16>) -> Self {
        Self { ip, port }
    }
}

impl fmt::Display for ProbeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}", std::net::SocketAddr::new(self.ip, port)),
            None => write!(f, "{}", self.ip),
        }
    }
}

/// What a probe observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Target answered as expected
    Healthy,

    /// No answer: timeout, refused connection, no echo reply
    Unreachable,

    /// Target answered, but with something other than the expected status
    UnexpectedStatus(u16),
}

/// Result of a single probe
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeVerdict {
    pub outcome: ProbeOutcome,

    /// Raw probe output and diagnostics, stored with any alert it causes
    pub details: serde_json::Value,
}

impl ProbeVerdict {
    pub fn new(outcome: ProbeOutcome, details: serde_json::Value) -> Self {
        Self { outcome, details }
    }

    pub fn ok(&self) -> bool {
        self.outcome == ProbeOutcome::Healthy
    }
}

/// Errors a checker reports to its caller
#[derive(Debug)]
pub enum ProbeError {
    /// The target cannot be probed with this checker (e.g. missing port)
    InvalidTarget(String),

    /// The checker could not be set up
    Setup(String),

    /// The probe process could not be run
    Io(std::io::Error),
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::InvalidTarget(msg) => write!(f, "invalid probe target: {}", msg),
            ProbeError::Setup(msg) => write!(f, "failed to set up checker: {}", msg),
            ProbeError::Io(err) => write!(f, "failed to run probe: {}", err),
        }
    }
}

impl std::error::Error for ProbeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProbeError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ProbeError {
    fn from(err: std::io::Error) -> Self {
        ProbeError::Io(err)
    }
}

/// A protocol-specific checker
#[async_trait]
pub trait ProbeChecker: Send + Sync {
    /// Protocol recorded on alerts raised from this checker's verdicts
    fn protocol(&self) -> AlertProtocol;

    /// Probe the target once, bounded by the checker's timeout
    async fn check(&self, target: &ProbeTarget) -> Result<ProbeVerdict, ProbeError>;
}

/// Checkers keyed by lowercase protocol name
#[derive(Clone, Default)]
pub struct CheckerRegistry {
    checkers: HashMap<String, Arc<dyn ProbeChecker>>,
}

impl CheckerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `icmp` and `http` checkers
    pub fn standard(timeout: Duration) -> Result<Self, ProbeError> {
        let mut registry = Self::new();
        registry.register("icmp", Arc::new(ReachabilityChecker::new(timeout)));
        registry.register("http", Arc::new(HttpChecker::new(timeout)?));
        Ok(registry)
    }

    pub fn register(&mut self, protocol: &str, checker: Arc<dyn ProbeChecker>) {
        self.checkers.insert(protocol.to_ascii_lowercase(), checker);
    }

    pub fn get(&self, protocol: &str) -> Option<Arc<dyn ProbeChecker>> {
        self.checkers.get(&protocol.to_ascii_lowercase()).cloned()
    }

    pub fn protocols(&self) -> Vec<String> {
        let mut names: Vec<String> = self.checkers.keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for CheckerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckerRegistry")
            .field("protocols", &self.protocols())
            .finish()
    }
}
