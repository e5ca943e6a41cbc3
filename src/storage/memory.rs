//! In-memory alert store (no persistence)
//!
//! Useful for:
//! - Testing without database dependencies
//! - Running the monitor without a database file (`"backend": "none"`)
//!
//! All data is lost on restart. A single write lock guards every mutation,
//! which makes `insert_if_absent` atomic.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use super::backend::{AlertQuery, AlertStats, AlertStore, HealthStatus, InsertOutcome};
use super::error::StorageResult;
use crate::alerts::{Alert, AlertId, AlertProtocol, Fingerprint, NewAlert};

/// In-memory alert store
#[derive(Debug, Default)]
pub struct MemoryBackend {
    alerts: RwLock<HashMap<AlertId, Alert>>,
}

impl MemoryBackend {
    /// Create a new, empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }
}

fn is_open_match(alert: &Alert, fingerprint: &Fingerprint) -> bool {
    !alert.resolved
        && alert.device_id == fingerprint.device_id
        && alert.alert_type == fingerprint.alert_type
        && alert.protocol == fingerprint.protocol
        && alert.message == fingerprint.message
}

#[async_trait]
impl AlertStore for MemoryBackend {
    async fn insert_if_absent(&self, alert: NewAlert) -> StorageResult<InsertOutcome> {
        let fingerprint = alert.fingerprint();
        let mut alerts = self.alerts.write().await;

        if let Some(existing) = alerts.values().find(|a| is_open_match(a, &fingerprint)) {
            return Ok(InsertOutcome::Existing(existing.clone()));
        }

        let record = alert.into_alert(Utc::now());
        debug!("in-memory store: created alert {}", record.id);
        alerts.insert(record.id.clone(), record.clone());
        Ok(InsertOutcome::Created(record))
    }

    async fn find_open(&self, fingerprint: &Fingerprint) -> StorageResult<Option<Alert>> {
        let alerts = self.alerts.read().await;
        Ok(alerts
            .values()
            .find(|a| is_open_match(a, fingerprint))
            .cloned())
    }

    async fn get(&self, id: &AlertId) -> StorageResult<Option<Alert>> {
        Ok(self.alerts.read().await.get(id).cloned())
    }

    async fn query(&self, query: AlertQuery) -> StorageResult<Vec<Alert>> {
        let alerts = self.alerts.read().await;

        let mut matching: Vec<Alert> = alerts
            .values()
            .filter(|a| query.matches(a))
            .cloned()
            .collect();

        // Ids start with the creation second, so they break ties within it
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        matching.truncate(query.limit.unwrap_or(usize::MAX));

        Ok(matching)
    }

    async fn resolve_open(
        &self,
        device_id: &str,
        protocol: Option<AlertProtocol>,
        message: &str,
    ) -> StorageResult<Option<Alert>> {
        let mut alerts = self.alerts.write().await;

        let found = alerts.values_mut().find(|a| {
            !a.resolved && a.device_id == device_id && a.protocol == protocol && a.message == message
        });

        Ok(found.map(|alert| {
            alert.resolved = true;
            alert.updated_at = Utc::now();
            alert.clone()
        }))
    }

    async fn resolve_by_id(&self, id: &AlertId) -> StorageResult<Option<Alert>> {
        let mut alerts = self.alerts.write().await;

        Ok(alerts.get_mut(id).map(|alert| {
            if !alert.resolved {
                alert.resolved = true;
                alert.updated_at = Utc::now();
            }
            alert.clone()
        }))
    }

    async fn resolve_all_for_device(&self, device_id: &str) -> StorageResult<usize> {
        let mut alerts = self.alerts.write().await;
        let now = Utc::now();

        let mut count = 0;
        for alert in alerts
            .values_mut()
            .filter(|a| !a.resolved && a.device_id == device_id)
        {
            alert.resolved = true;
            alert.updated_at = now;
            count += 1;
        }

        Ok(count)
    }

    async fn delete(&self, id: &AlertId) -> StorageResult<bool> {
        Ok(self.alerts.write().await.remove(id).is_some())
    }

    async fn get_stats(&self) -> StorageResult<AlertStats> {
        let alerts = self.alerts.read().await;
        Ok(AlertStats {
            total: alerts.len(),
            open: alerts.values().filter(|a| a.is_open()).count(),
        })
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        let total = self.alerts.read().await.len();
        Ok(HealthStatus {
            healthy: true,
            message: "In-memory alert store operational".to_string(),
            metadata: HashMap::from([
                ("backend".to_string(), "memory".to_string()),
                ("total_alerts".to_string(), total.to_string()),
            ]),
        })
    }

    async fn close(&self) -> StorageResult<()> {
        debug!("closing in-memory backend (no-op)");
        Ok(())
    }
}
