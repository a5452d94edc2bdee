//! Administrative namespace

use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use xfboard::backend::namespaces::Namespace;

use crate::common::{assert_single_error, find, names, Harness};

#[tokio::test]
async fn test_health_and_metrics() {
    let h = Harness::new().await;
    let _member = h.board_client(&h.member).await;
    let mut admin = h.connect(Namespace::System, &h.admin).await;

    admin.send("system:health-check", json!({})).await;
    let events = admin.drain();
    let health = find(&events, "system:health-status");
    assert_eq!(health.data["status"], json!("healthy"));
    assert_eq!(health.data["connections"], json!(2));

    admin.send("system:get-metrics", json!({ "metrics": ["bogus"] })).await;
    assert_single_error(&admin.drain(), "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_maintenance_reaches_the_default_namespace() {
    let h = Harness::new().await;
    let mut lobby = h.connect(Namespace::Root, &h.member).await;
    let mut admin = h.connect(Namespace::System, &h.admin).await;

    admin
        .send("system:maintenance-mode", json!({ "enabled": true, "reason": "upgrade" }))
        .await;

    assert_eq!(names(&admin.drain()), vec!["system:maintenance-updated"]);
    let notices = lobby.drain();
    assert_eq!(names(&notices), vec!["system:maintenance"]);
    assert_eq!(notices[0].data["enabled"], json!(true));

    admin.send("system:health-check", json!({})).await;
    assert_eq!(find(&admin.drain(), "system:health-status").data["status"], json!("maintenance"));
}

#[tokio::test]
async fn test_unknown_config_key_is_rejected() {
    let h = Harness::new().await;
    let mut admin = h.connect(Namespace::System, &h.admin).await;
    admin
        .send("system:update-config", json!({ "configKey": "database.url", "configValue": "x" }))
        .await;
    assert_single_error(&admin.drain(), "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_restart_must_be_in_the_future() {
    let h = Harness::new().await;
    let mut admin = h.connect(Namespace::System, &h.admin).await;
    admin
        .send(
            "system:restart",
            json!({ "reason": "patch", "scheduledTime": "2000-01-01T00:00:00Z" }),
        )
        .await;
    assert_single_error(&admin.drain(), "VALIDATION_ERROR");
}

#[tokio::test(start_paused = true)]
async fn test_monitoring_stops_on_disconnect() {
    let h = Harness::new().await;
    let mut admin = h.connect(Namespace::System, &h.admin).await;

    admin.send("system:subscribe-monitoring", json!({ "interval": 5000 })).await;
    tokio::time::sleep(Duration::from_millis(10_500)).await;
    let ticks = admin
        .drain()
        .into_iter()
        .filter(|e| e.event == "system:monitoring-data")
        .count();
    assert!(ticks >= 2, "expected at least two samples, got {}", ticks);

    admin.disconnect().await;
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(admin.drain().iter().all(|e| e.event != "system:monitoring-data"));
}
