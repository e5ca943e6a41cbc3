//! Alert lifecycle management
//!
//! The [`LifecycleManager`] is the single entry point that opens and resolves
//! alerts, for the monitoring loop as well as for the operator API.
//!
//! ## Lifecycle
//!
//! ```text
//! (none) --probe fails, no open fingerprint--> Open
//! Open   --probe fails again-----------------> Open (unchanged)
//! Open   --probe succeeds / operator resolve--> Resolved
//! Resolved --probe fails again---------------> new Open record
//! ```
//!
//! Deduplication is enforced by the store (`insert_if_absent`). The
//! [`ProblemTracker`] is only a cache of "recently observed failing"
//! fingerprints: losing it on restart is harmless, because the next failure
//! finds the open record in the store and the next success resolves it.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, trace};

use crate::alerts::{Alert, AlertId, NewAlert};
use crate::faults::{FaultCondition, Supersede};
use crate::storage::{AlertQuery, AlertStats, AlertStore, InsertOutcome, StorageError};

/// What a single report did to the store
#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    /// A new alert was created
    Opened(Alert),

    /// The condition already had an open alert; nothing was written
    AlreadyOpen(Alert),

    /// The open alert for the condition was resolved
    Resolved(Alert),

    /// The condition was healthy and had nothing open
    NothingToResolve,
}

#[derive(Debug)]
pub enum LifecycleError {
    /// Alert id is not 24 hex characters
    InvalidId(String),

    /// Alert payload failed validation
    InvalidAlert(String),

    Storage(StorageError),
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleError::InvalidId(id) => write!(f, "Invalid alert ID: {}", id),
            LifecycleError::InvalidAlert(msg) => write!(f, "Invalid alert: {}", msg),
            LifecycleError::Storage(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for LifecycleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LifecycleError::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StorageError> for LifecycleError {
    fn from(err: StorageError) -> Self {
        LifecycleError::Storage(err)
    }
}

/// Recently observed failing conditions, keyed by fingerprint key
#[derive(Debug)]
pub struct ProblemTracker {
    last_seen: RwLock<HashMap<String, DateTime<Utc>>>,
    expiration: chrono::Duration,
}

impl ProblemTracker {
    pub fn new(expiration: chrono::Duration) -> Self {
        Self {
            last_seen: RwLock::new(HashMap::new()),
            expiration,
        }
    }

    pub async fn touch(&self, key: String, now: DateTime<Utc>) {
        self.last_seen.write().await.insert(key, now);
    }

    pub async fn forget(&self, key: &str) -> bool {
        self.last_seen.write().await.remove(key).is_some()
    }

    #[cfg(test)]
    pub async fn contains(&self, key: &str) -> bool {
        self.last_seen.read().await.contains_key(key)
    }

    /// Drop entries not refreshed within the expiration window
    ///
    /// Store records are left alone: an open alert stays open until a
    /// success or an operator resolves it.
    pub async fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut last_seen = self.last_seen.write().await;
        let before = last_seen.len();
        last_seen.retain(|_, seen| now - *seen <= self.expiration);
        before - last_seen.len()
    }

    pub async fn len(&self) -> usize {
        self.last_seen.read().await.len()
    }

    #[cfg(test)]
    pub async fn is_empty(&self) -> bool {
        self.last_seen.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.last_seen.write().await.clear();
    }
}

/// Opens, deduplicates and resolves alerts
pub struct LifecycleManager {
    store: Arc<dyn AlertStore>,
    tracker: ProblemTracker,
}

impl LifecycleManager {
    pub fn new(store: Arc<dyn AlertStore>, problem_expiration: chrono::Duration) -> Self {
        Self {
            store,
            tracker: ProblemTracker::new(problem_expiration),
        }
    }

    pub fn store(&self) -> &Arc<dyn AlertStore> {
        &self.store
    }

    pub fn tracker(&self) -> &ProblemTracker {
        &self.tracker
    }

    /// Record one probe verdict for one condition
    ///
    /// A failing verdict opens an alert unless one is already open for the
    /// fingerprint. A passing verdict resolves the open alert matching
    /// `(device_id, protocol, message)`, if any.
    #[instrument(skip(self, condition, details), fields(device = %condition.device_id))]
    pub async fn report(
        &self,
        ok: bool,
        condition: &FaultCondition,
        details: serde_json::Value,
    ) -> Result<ReportOutcome, LifecycleError> {
        let key = condition.fingerprint().key();

        if ok {
            self.tracker.forget(&key).await;

            return match self
                .store
                .resolve_open(&condition.device_id, condition.protocol, &condition.message)
                .await?
            {
                Some(alert) => {
                    info!("resolved alert {}: {}", alert.id, alert.message);
                    Ok(ReportOutcome::Resolved(alert))
                }
                None => Ok(ReportOutcome::NothingToResolve),
            };
        }

        self.tracker.touch(key, Utc::now()).await;

        match self.store.insert_if_absent(condition.to_new_alert(details)).await? {
            InsertOutcome::Created(alert) => {
                info!(
                    "opened {} alert {}: {}",
                    alert.severity, alert.id, alert.message
                );
                Ok(ReportOutcome::Opened(alert))
            }
            InsertOutcome::Existing(alert) => {
                trace!("alert {} already open", alert.id);
                Ok(ReportOutcome::AlreadyOpen(alert))
            }
        }
    }

    /// Resolve every open alert of a family except `keep`
    pub async fn resolve_superseded(&self, supersede: &Supersede) -> Result<Vec<Alert>, LifecycleError> {
        let open = self
            .store
            .query(AlertQuery::open_for_device(supersede.family.device_id.clone()))
            .await?;

        let mut resolved = Vec::new();
        for alert in open {
            let fingerprint = alert.fingerprint();
            if !supersede.family.contains(&fingerprint)
                || supersede.keep.as_deref() == Some(alert.message.as_str())
            {
                continue;
            }

            self.tracker.forget(&fingerprint.key()).await;
            if let Some(alert) = self
                .store
                .resolve_open(&alert.device_id, alert.protocol, &alert.message)
                .await?
            {
                info!("resolved superseded alert {}: {}", alert.id, alert.message);
                resolved.push(alert);
            }
        }

        Ok(resolved)
    }

    /// Create an alert from an external payload, deduplicated like probe alerts
    pub async fn create(&self, alert: NewAlert) -> Result<InsertOutcome, LifecycleError> {
        alert.validate().map_err(LifecycleError::InvalidAlert)?;
        let outcome = self.store.insert_if_absent(alert).await?;
        if outcome.was_created() {
            info!("created alert {} via API", outcome.alert().id);
        }
        Ok(outcome)
    }

    /// Operator resolve by id
    ///
    /// Returns `Ok(None)` when no such alert exists. Resolving an already
    /// resolved alert returns it unchanged.
    pub async fn resolve(&self, raw_id: &str) -> Result<Option<Alert>, LifecycleError> {
        let id = parse_id(raw_id)?;
        let alert = self.store.resolve_by_id(&id).await?;
        if let Some(alert) = &alert {
            self.tracker.forget(&alert.fingerprint().key()).await;
            info!("alert {} resolved by operator", alert.id);
        }
        Ok(alert)
    }

    pub async fn resolve_all_for_device(&self, device_id: &str) -> Result<usize, LifecycleError> {
        let count = self.store.resolve_all_for_device(device_id).await?;
        info!("resolved {count} alerts of device {device_id}");
        Ok(count)
    }

    pub async fn delete(&self, raw_id: &str) -> Result<bool, LifecycleError> {
        let id = parse_id(raw_id)?;
        let deleted = self.store.delete(&id).await?;
        if deleted {
            debug!("deleted alert {id}");
        }
        Ok(deleted)
    }

    pub async fn list(&self, query: AlertQuery) -> Result<Vec<Alert>, LifecycleError> {
        Ok(self.store.query(query).await?)
    }

    pub async fn stats(&self) -> Result<AlertStats, LifecycleError> {
        Ok(self.store.get_stats().await?)
    }

    /// Drop tracker entries not refreshed within the expiration window
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let expired = self.tracker.sweep(now).await;
        if expired > 0 {
            debug!("dropped {expired} expired problem tracker entries");
        }
        expired
    }

    pub async fn tracker_len(&self) -> usize {
        self.tracker.len().await
    }

    pub async fn clear_tracker(&self) {
        self.tracker.clear().await;
    }
}

fn parse_id(raw_id: &str) -> Result<AlertId, LifecycleError> {
    AlertId::parse(raw_id).ok_or_else(|| LifecycleError::InvalidId(raw_id.to_string()))
}
