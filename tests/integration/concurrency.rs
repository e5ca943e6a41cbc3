//! Concurrent writers must never produce two open alerts for one fingerprint
//!
//! The monitoring loop and the API share one lifecycle manager and store, so
//! both paths race here on purpose.

use std::sync::Arc;

use futures::future::join_all;
use network_monitoring::{
    alerts::{AlertProtocol, AlertType, Severity},
    faults::FaultCondition,
    lifecycle::{LifecycleManager, ReportOutcome},
    storage::AlertStore,
};

use crate::helpers::{lifecycle_for, memory_store};

fn offline() -> FaultCondition {
    FaultCondition {
        device_id: "r6".to_string(),
        device_name: Some("Router R6".to_string()),
        alert_type: AlertType::Connectivity,
        protocol: Some(AlertProtocol::Icmp),
        severity: Severity::Critical,
        message: "Router R6 (192.168.100.8) is offline".to_string(),
    }
}

async fn race_reports_and_creates(lifecycle: Arc<LifecycleManager>) {
    let tasks = (0..24).map(|i| {
        let lifecycle = lifecycle.clone();
        tokio::spawn(async move {
            if i % 2 == 0 {
                matches!(
                    lifecycle.report(false, &offline(), serde_json::Value::Null).await.unwrap(),
                    ReportOutcome::Opened(_)
                )
            } else {
                lifecycle
                    .create(offline().to_new_alert(serde_json::Value::Null))
                    .await
                    .unwrap()
                    .was_created()
            }
        })
    });

    let created = join_all(tasks)
        .await
        .into_iter()
        .filter(|created| *created.as_ref().unwrap())
        .count();

    assert_eq!(created, 1);

    let stats = lifecycle.stats().await.unwrap();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.open, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_memory_store_race() {
    race_reports_and_creates(lifecycle_for(memory_store())).await;
}

#[cfg(feature = "storage-sqlite")]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sqlite_store_race() {
    use network_monitoring::storage::sqlite::SqliteBackend;

    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn AlertStore> =
        Arc::new(SqliteBackend::new(dir.path().join("race.db")).await.unwrap());

    race_reports_and_creates(lifecycle_for(store)).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_resolve_races_with_failure_reports() {
    let lifecycle = lifecycle_for(memory_store());
    lifecycle.report(false, &offline(), serde_json::Value::Null).await.unwrap();

    // Interleave recoveries and failures; whatever the order, at most one stays open
    let tasks = (0..20).map(|i| {
        let lifecycle = lifecycle.clone();
        tokio::spawn(async move {
            lifecycle
                .report(i % 3 != 0, &offline(), serde_json::Value::Null)
                .await
                .unwrap();
        })
    });
    join_all(tasks).await;

    let stats = lifecycle.stats().await.unwrap();
    assert!(stats.open <= 1);
}
