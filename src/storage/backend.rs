//! Alert store trait definition
//!
//! This module defines the `AlertStore` trait that every persistence
//! backend implements, together with the query and result types it uses.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::StorageResult;
use crate::alerts::{Alert, AlertId, AlertProtocol, Fingerprint, NewAlert, Severity};

/// Hard cap applied by the list endpoint
pub const DEFAULT_LIST_LIMIT: usize = 50;

/// Filter for listing alerts
///
/// Results are always ordered by `created_at` descending (newest first).
#[derive(Debug, Clone, Default)]
pub struct AlertQuery {
    /// Only alerts with this resolution state
    pub resolved: Option<bool>,

    /// Only alerts for this device
    pub device_id: Option<String>,

    /// Only alerts whose severity is in this set (empty set = no filter)
    pub severities: Vec<Severity>,

    /// Only alerts created at or after this instant
    pub created_after: Option<DateTime<Utc>>,

    /// Maximum number of results
    pub limit: Option<usize>,
}

impl AlertQuery {
    /// Open alerts of one device, without a limit
    pub fn open_for_device(device_id: impl Into<String>) -> Self {
        Self {
            resolved: Some(false),
            device_id: Some(device_id.into()),
            ..Default::default()
        }
    }

    /// Check a record against every filter except the limit
    pub fn matches(&self, alert: &Alert) -> bool {
        if let Some(resolved) = self.resolved {
            if alert.resolved != resolved {
                return false;
            }
        }
        if let Some(device_id) = &self.device_id {
            if &alert.device_id != device_id {
                return false;
            }
        }
        if !self.severities.is_empty() && !self.severities.contains(&alert.severity) {
            return false;
        }
        if let Some(after) = self.created_after {
            if alert.created_at < after {
                return false;
            }
        }
        true
    }
}

/// Result of the atomic "find open by fingerprint, else create" operation
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    /// No open alert existed, this one was stored
    Created(Alert),

    /// An open alert with the same fingerprint already existed and was left untouched
    Existing(Alert),
}

impl InsertOutcome {
    pub fn alert(&self) -> &Alert {
        match self {
            InsertOutcome::Created(alert) | InsertOutcome::Existing(alert) => alert,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, InsertOutcome::Created(_))
    }
}

/// Health status of the alert store
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Is the backend operational?
    pub healthy: bool,

    /// Human-readable status message
    pub message: String,

    /// Additional backend-specific metadata
    pub metadata: std::collections::HashMap<String, String>,
}

/// Alert counts for the stats endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertStats {
    pub total: usize,
    pub open: usize,
}

/// Trait for alert persistence backends
///
/// The store is the single source of truth for alert state. It is shared
/// between the monitoring loop and the HTTP API, so every mutating method
/// must be atomic on its own.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync` as they will be used
/// across async tasks.
///
/// ## Error Handling
///
/// Methods return `StorageResult<T>` which wraps `StorageError`.
/// Implementations should convert backend-specific errors to
/// `StorageError` variants.
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Create an alert unless an open alert with the same fingerprint exists
    ///
    /// This is the only way alerts are created. Two callers racing on the
    /// same fingerprint must end up with exactly one open alert: one gets
    /// `Created`, the other `Existing`.
    async fn insert_if_absent(&self, alert: NewAlert) -> StorageResult<InsertOutcome>;

    /// Find the open alert for a fingerprint, if any
    async fn find_open(&self, fingerprint: &Fingerprint) -> StorageResult<Option<Alert>>;

    /// Fetch a single alert by id, resolved or not
    async fn get(&self, id: &AlertId) -> StorageResult<Option<Alert>>;

    /// List alerts, newest first
    async fn query(&self, query: AlertQuery) -> StorageResult<Vec<Alert>>;

    /// Resolve one open alert matching device, protocol and message
    ///
    /// Returns the updated record, or `None` if nothing was open.
    async fn resolve_open(
        &self,
        device_id: &str,
        protocol: Option<AlertProtocol>,
        message: &str,
    ) -> StorageResult<Option<Alert>>;

    /// Mark an alert resolved by id
    ///
    /// Resolving an already-resolved alert returns it unchanged (its
    /// `updated_at` is not touched). Returns `None` if the id is unknown.
    async fn resolve_by_id(&self, id: &AlertId) -> StorageResult<Option<Alert>>;

    /// Resolve every open alert of a device, returning how many changed
    async fn resolve_all_for_device(&self, device_id: &str) -> StorageResult<usize>;

    /// Delete an alert, returning whether it existed
    async fn delete(&self, id: &AlertId) -> StorageResult<bool>;

    /// Total and open alert counts
    async fn get_stats(&self) -> StorageResult<AlertStats>;

    /// Check backend health
    ///
    /// Performs a lightweight operation to verify the backend
    /// is operational (e.g., ping database, check file access).
    async fn health_check(&self) -> StorageResult<HealthStatus>;

    /// Close the backend and release resources
    async fn close(&self) -> StorageResult<()>;
}
