//! Integration tests for the monitor actor driving real HTTP checks
//!
//! Device reachability uses a scripted checker (ICMP needs privileges and a
//! network); HTTP services are served by wiremock.

use std::sync::Arc;
use std::time::Duration;

use network_monitoring::{
    actors::{MonitorHandle, SchedulerState},
    alerts::{AlertProtocol, Severity},
    monitors::{CheckerRegistry, HttpChecker, ProbeOutcome},
    storage::AlertQuery,
};
use pretty_assertions::assert_eq;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::{ScriptedChecker, config, device, http_service, memory_lifecycle, mock_addr};

fn registry_with_http(icmp: Arc<ScriptedChecker>) -> CheckerRegistry {
    let mut registry = CheckerRegistry::new();
    registry.register("icmp", icmp);
    registry.register(
        "http",
        Arc::new(HttpChecker::new(Duration::from_secs(2)).unwrap()),
    );
    registry
}

async fn respond_with(server: &MockServer, status: u16) {
    server.reset().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_http_503_lifecycle_through_monitor() {
    let server = MockServer::start().await;
    respond_with(&server, 503).await;

    let lifecycle = memory_lifecycle();
    let icmp = ScriptedChecker::always(AlertProtocol::Icmp, ProbeOutcome::Healthy);
    let service = http_service("server1", mock_addr(&server));
    let expected = format!("HTTP service on {} returned 503", mock_addr(&server));

    let handle = MonitorHandle::spawn(
        &config(vec![device("server1", "127.0.0.1", "Web Server")], vec![service]),
        lifecycle.clone(),
        registry_with_http(icmp),
    );

    // Round 1 ran on spawn; round 2 sees the same 503
    let summary = handle.run_now().await.unwrap();
    assert_eq!(summary.services_checked, 1);
    assert_eq!(summary.opened, 0);

    let open = lifecycle.list(AlertQuery::open_for_device("server1")).await.unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].message, expected);
    assert_eq!(open[0].severity, Severity::Major);
    assert_eq!(open[0].device_name.as_deref(), Some("Web Server"));

    respond_with(&server, 200).await;
    let summary = handle.run_now().await.unwrap();
    assert_eq!(summary.resolved, 1);

    let open = lifecycle.list(AlertQuery::open_for_device("server1")).await.unwrap();
    assert!(open.is_empty());

    handle.shutdown().await;
}

#[tokio::test]
async fn test_stopped_service_is_unreachable() {
    // Bind then drop a listener so the port refuses connections
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let lifecycle = memory_lifecycle();
    let handle = MonitorHandle::spawn(
        &config(vec![], vec![http_service("server2", addr)]),
        lifecycle.clone(),
        registry_with_http(ScriptedChecker::always(AlertProtocol::Icmp, ProbeOutcome::Healthy)),
    );

    handle.run_now().await.unwrap();

    let open = lifecycle.list(AlertQuery::open_for_device("server2")).await.unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].message, format!("HTTP service on {addr} is unreachable"));
    assert_eq!(open[0].severity, Severity::Critical);

    handle.shutdown().await;
}

#[tokio::test]
async fn test_devices_are_checked_before_services() {
    let server = MockServer::start().await;
    respond_with(&server, 200).await;

    let icmp = ScriptedChecker::always(AlertProtocol::Icmp, ProbeOutcome::Healthy);
    let handle = MonitorHandle::spawn(
        &config(
            vec![device("a", "10.0.0.1", "A"), device("b", "10.0.0.2", "B")],
            vec![http_service("a", mock_addr(&server))],
        ),
        memory_lifecycle(),
        registry_with_http(icmp.clone()),
    );

    let summary = handle.run_now().await.unwrap();
    assert_eq!(summary.devices_checked, 2);
    assert_eq!(summary.services_checked, 1);
    assert_eq!(summary.errors, 0);

    // Two rounds, devices in configured order each time
    let calls: Vec<String> = icmp.calls().iter().map(|ip| ip.to_string()).collect();
    assert_eq!(calls, vec!["10.0.0.1", "10.0.0.2", "10.0.0.1", "10.0.0.2"]);

    handle.shutdown().await;
}

#[tokio::test]
async fn test_scheduler_is_idle_between_rounds() {
    let handle = MonitorHandle::spawn(
        &config(vec![device("a", "10.0.0.1", "A")], vec![]),
        memory_lifecycle(),
        registry_with_http(ScriptedChecker::always(AlertProtocol::Icmp, ProbeOutcome::Healthy)),
    );

    handle.run_now().await.unwrap();
    assert_eq!(handle.state(), SchedulerState::Idle);

    let probe = handle.clone();
    handle.shutdown().await;
    assert_eq!(probe.state(), SchedulerState::Stopped);
}

#[tokio::test]
async fn test_service_on_unknown_device_still_alerts() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let lifecycle = memory_lifecycle();
    let handle = MonitorHandle::spawn(
        &config(vec![], vec![http_service("ghost", addr)]),
        lifecycle.clone(),
        registry_with_http(ScriptedChecker::always(AlertProtocol::Icmp, ProbeOutcome::Healthy)),
    );

    handle.run_now().await.unwrap();

    let open = lifecycle.list(AlertQuery::open_for_device("ghost")).await.unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].device_name, None);

    handle.shutdown().await;
}
