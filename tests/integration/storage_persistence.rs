//! Alert state must survive a restart of the hub
//!
//! The in-memory problem tracker is lost on restart; the SQLite store is the
//! source of truth and must keep deduplication and auto-resolve working.

use std::sync::Arc;

use assert_matches::assert_matches;
use network_monitoring::{
    faults,
    lifecycle::{LifecycleManager, ReportOutcome},
    monitors::{ProbeOutcome, ProbeVerdict},
    storage::{AlertQuery, AlertStore, sqlite::SqliteBackend},
};
use tempfile::tempdir;

use crate::helpers::device;

async fn open(path: &std::path::Path) -> (Arc<dyn AlertStore>, LifecycleManager) {
    let store: Arc<dyn AlertStore> = Arc::new(SqliteBackend::new(path).await.unwrap());
    let lifecycle = LifecycleManager::new(store.clone(), chrono::Duration::minutes(30));
    (store, lifecycle)
}

#[tokio::test]
async fn test_open_alert_survives_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("alerts.db");
    let r6 = device("r6", "192.168.100.8", "Router R6");
    let down = ProbeVerdict::new(ProbeOutcome::Unreachable, serde_json::json!({ "alive": false }));
    let up = ProbeVerdict::new(ProbeOutcome::Healthy, serde_json::Value::Null);

    let offline = faults::plan_for_device(&r6, &down).failing.unwrap();

    {
        let (store, lifecycle) = open(&path).await;
        let outcome = lifecycle.report(false, &offline, down.details.clone()).await.unwrap();
        assert_matches!(outcome, ReportOutcome::Opened(_));
        store.close().await.unwrap();
    }

    let (store, lifecycle) = open(&path).await;
    assert_eq!(lifecycle.tracker_len().await, 0);

    // Still failing after restart: no duplicate
    let outcome = lifecycle.report(false, &offline, down.details.clone()).await.unwrap();
    let existing = assert_matches!(outcome, ReportOutcome::AlreadyOpen(alert) => alert);
    assert_eq!(existing.details["alive"], false);

    // Recovery after restart resolves the record written before it
    let cleared = &faults::plan_for_device(&r6, &up).cleared[0];
    let outcome = lifecycle.report(true, cleared, serde_json::Value::Null).await.unwrap();
    assert_matches!(outcome, ReportOutcome::Resolved(alert) if alert.id == existing.id);

    let all = lifecycle.list(AlertQuery::default()).await.unwrap();
    assert_eq!(all.len(), 1);
    assert!(all[0].resolved);

    store.close().await.unwrap();
}

#[tokio::test]
async fn test_resolved_history_is_kept() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("alerts.db");
    let r6 = device("r6", "192.168.100.8", "Router R6");
    let down = ProbeVerdict::new(ProbeOutcome::Unreachable, serde_json::Value::Null);
    let offline = faults::plan_for_device(&r6, &down).failing.unwrap();

    let (store, lifecycle) = open(&path).await;
    for _ in 0..3 {
        lifecycle.report(false, &offline, serde_json::Value::Null).await.unwrap();
        lifecycle.report(true, &offline, serde_json::Value::Null).await.unwrap();
    }
    store.close().await.unwrap();

    let (_store, lifecycle) = open(&path).await;
    let history = lifecycle
        .list(AlertQuery {
            resolved: Some(true),
            device_id: Some("r6".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(history.len(), 3);
    assert!(history.windows(2).all(|w| w[0].created_at >= w[1].created_at));
}
