//! Integration tests for API endpoints
//!
//! These tests verify that:
//! - Alert endpoints create, list, resolve and delete records
//! - Malformed input is rejected with a structured 400
//! - Authentication middleware protects everything but health
//! - Stats and manual rounds reflect the monitor

use std::net::SocketAddr;
use std::sync::Arc;

use network_monitoring::{
    actors::{MonitorHandle, RoundSummary},
    alerts::{Alert, AlertProtocol},
    api::{ApiConfig, ApiState, MessageResponse, ResolveAllResponse, StatsResponse, spawn_api_server},
    lifecycle::LifecycleManager,
    monitors::{CheckerRegistry, ProbeOutcome},
};
use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use serde_json::{Value, json};

use crate::helpers::{ScriptedChecker, config, device, memory_lifecycle};

// Helper to create test API server
async fn spawn_test_api(lifecycle: Arc<LifecycleManager>, monitor: Option<MonitorHandle>, token: Option<&str>) -> SocketAddr {
    let config = ApiConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(), // Random port
        auth_token: token.map(String::from),
        enable_cors: true,
    };

    spawn_api_server(config, ApiState::new(lifecycle, monitor)).await.unwrap()
}

fn alert_payload(device_id: &str, severity: &str, message: &str) -> Value {
    json!({
        "deviceId": device_id,
        "deviceName": "Router R6",
        "alertType": "connectivity",
        "protocol": "icmp",
        "severity": severity,
        "message": message,
        "details": { "source": "test" }
    })
}

async fn create(client: &reqwest::Client, addr: SocketAddr, payload: &Value) -> (StatusCode, Alert) {
    let response = client
        .post(format!("http://{addr}/api/alerts"))
        .json(payload)
        .send()
        .await
        .unwrap();
    let status = response.status();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn test_create_is_deduplicated() {
    let addr = spawn_test_api(memory_lifecycle(), None, None).await;
    let client = reqwest::Client::new();
    let payload = alert_payload("r6", "critical", "Router R6 (192.168.100.8) is offline");

    let (status, first) = create(&client, addr, &payload).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(!first.resolved);
    assert_eq!(first.details["source"], "test");

    let (status, second) = create(&client, addr, &payload).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first.id, second.id);
}

#[tokio::test]
async fn test_alert_json_shape() {
    let addr = spawn_test_api(memory_lifecycle(), None, None).await;
    let client = reqwest::Client::new();

    let body: Value = client
        .post(format!("http://{addr}/api/alerts"))
        .json(&alert_payload("r6", "critical", "down"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let id = body["_id"].as_str().unwrap();
    assert_eq!(id.len(), 24);
    assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(body["deviceId"], "r6");
    assert_eq!(body["alertType"], "connectivity");
    assert_eq!(body["resolved"], false);
    assert!(body["createdAt"].is_string());
    assert!(body["updatedAt"].is_string());
}

#[tokio::test]
async fn test_create_rejects_invalid_payload() {
    let addr = spawn_test_api(memory_lifecycle(), None, None).await;
    let client = reqwest::Client::new();

    for payload in [
        json!({ "deviceId": "r6", "alertType": "connectivity", "severity": "critical" }),
        json!({ "deviceId": "r6", "alertType": "weather", "severity": "critical", "message": "x" }),
        json!({ "deviceId": "", "alertType": "connectivity", "severity": "critical", "message": "x" }),
    ] {
        let response = client
            .post(format!("http://{addr}/api/alerts"))
            .json(&payload)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = response.json().await.unwrap();
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn test_list_filters_and_alias() {
    let addr = spawn_test_api(memory_lifecycle(), None, None).await;
    let client = reqwest::Client::new();

    create(&client, addr, &alert_payload("r6", "critical", "r6 down")).await;
    create(&client, addr, &alert_payload("r6", "minor", "r6 flapping")).await;
    create(&client, addr, &alert_payload("r7", "major", "r7 slow")).await;

    let alerts: Vec<Alert> = client
        .get(format!("http://{addr}/api/alerts?deviceId=r6&severity=critical,major"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].message, "r6 down");

    let alerts: Vec<Alert> = client
        .get(format!("http://{addr}/api/alerts/getAlerts?resolved=false&lastMinutes=5"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(alerts.len(), 3);
    assert_eq!(alerts[0].message, "r7 slow");
}

#[tokio::test]
async fn test_list_rejects_bad_filters() {
    let addr = spawn_test_api(memory_lifecycle(), None, None).await;
    let client = reqwest::Client::new();

    for query in [
        "severity=urgent",
        "resolved=maybe",
        "lastMinutes=abc",
        "lastMinutes=9223372036854775807",
    ] {
        let response = client
            .get(format!("http://{addr}/api/alerts?{query}"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "query {query}");
    }
}

#[tokio::test]
async fn test_list_is_capped_at_fifty() {
    let addr = spawn_test_api(memory_lifecycle(), None, None).await;
    let client = reqwest::Client::new();

    for i in 0..55 {
        create(&client, addr, &alert_payload("r6", "warning", &format!("fault {i}"))).await;
    }

    let alerts: Vec<Alert> = client
        .get(format!("http://{addr}/api/alerts"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(alerts.len(), 50);
    assert!(alerts.windows(2).all(|w| w[0].created_at >= w[1].created_at));
}

#[tokio::test]
async fn test_resolve_by_id() {
    let addr = spawn_test_api(memory_lifecycle(), None, None).await;
    let client = reqwest::Client::new();
    let (_, alert) = create(&client, addr, &alert_payload("r6", "critical", "down")).await;

    let response = client
        .patch(format!("http://{addr}/api/alerts/{}/resolve", alert.id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let resolved: Alert = response.json().await.unwrap();
    assert!(resolved.resolved);
    assert_eq!(resolved.id, alert.id);

    // Malformed id
    let response = client
        .patch(format!("http://{addr}/api/alerts/not-an-id/resolve"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Well-formed but unknown id
    let response = client
        .patch(format!("http://{addr}/api/alerts/0123456789abcdef01234567/resolve"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_resolve_all_for_device() {
    let addr = spawn_test_api(memory_lifecycle(), None, None).await;
    let client = reqwest::Client::new();

    create(&client, addr, &alert_payload("r6", "critical", "one")).await;
    create(&client, addr, &alert_payload("r6", "major", "two")).await;
    create(&client, addr, &alert_payload("r7", "major", "other")).await;

    let body: ResolveAllResponse = client
        .patch(format!("http://{addr}/api/alerts/device/r6/resolve-all"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(
        body,
        ResolveAllResponse {
            modified: 2,
            message: "2 alerts resolved".to_string(),
        }
    );

    let open: Vec<Alert> = client
        .get(format!("http://{addr}/api/alerts?resolved=false"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].device_id, "r7");
}

#[tokio::test]
async fn test_delete_alert() {
    let addr = spawn_test_api(memory_lifecycle(), None, None).await;
    let client = reqwest::Client::new();
    let (_, alert) = create(&client, addr, &alert_payload("r6", "critical", "down")).await;
    let url = format!("http://{addr}/api/alerts/{}", alert.id);

    let response = client.delete(&url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: MessageResponse = response.json().await.unwrap();
    assert_eq!(body.message, "Alert deleted successfully");

    let response = client.delete(&url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_auth_protects_alerts_but_not_health() {
    let addr = spawn_test_api(memory_lifecycle(), None, Some("test-token")).await;
    let client = reqwest::Client::new();

    let response = client.get(format!("http://{addr}/api/health")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = client.get(format!("http://{addr}/api/alerts")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client
        .get(format!("http://{addr}/api/alerts"))
        .bearer_auth("wrong-token")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = client
        .get(format!("http://{addr}/api/alerts"))
        .bearer_auth("test-token")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_stats_and_manual_round() {
    let lifecycle = memory_lifecycle();
    let mut checkers = CheckerRegistry::new();
    checkers.register(
        "icmp",
        ScriptedChecker::always(AlertProtocol::Icmp, ProbeOutcome::Unreachable),
    );
    let monitor = MonitorHandle::spawn(
        &config(vec![device("r6", "192.168.100.8", "Router R6")], vec![]),
        lifecycle.clone(),
        checkers,
    );

    let addr = spawn_test_api(lifecycle, Some(monitor.clone()), None).await;
    let client = reqwest::Client::new();

    let summary: RoundSummary = client
        .post(format!("http://{addr}/api/monitor/run"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(summary.devices_checked, 1);

    let stats: StatsResponse = client
        .get(format!("http://{addr}/api/stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats.devices, 1);
    assert_eq!(stats.open_alerts, 1);
    assert_eq!(stats.total_alerts, 1);
    assert_eq!(stats.tracked_problems, 1);

    monitor.shutdown().await;
}

#[tokio::test]
async fn test_manual_round_without_monitor() {
    let addr = spawn_test_api(memory_lifecycle(), None, None).await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/api/monitor/run"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
