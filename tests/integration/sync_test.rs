//! Sync engine tests
//!
//! Drain behaviour against a mock batch endpoint: empty queue, single
//! flight, transport failure, partial results and rejections.

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use wiremock::MockServer;

use gestion_sync::client::local_db::KeyValueStore;
use gestion_sync::client::DrainOutcome;
use gestion_sync::shared::event::{ConnectionStatus, Indicator, Notification, NotificationLevel, SyncEvent};
use gestion_sync::shared::operation::WriteMethod;

use crate::common::{
    api_root, batch_reply, drain_events, memory_client, mount_slow_sync, mount_sync, received_batches,
    unreachable_api_root,
};

#[tokio::test]
async fn test_empty_drain_makes_no_request() {
    let server = MockServer::start().await;
    let (client, _) = memory_client(&api_root(&server));
    let mut events = client.subscribe();

    let outcome = client.sync_now().await;

    assert_eq!(outcome, DrainOutcome::Empty);
    assert!(server.received_requests().await.unwrap().is_empty());
    assert!(drain_events(&mut events).is_empty());
    assert!(client.state().is_online());
}

#[tokio::test]
async fn test_partial_reconciliation_keeps_only_failed_operation() {
    let server = MockServer::start().await;
    mount_sync(&server, batch_reply(&[true, false, true]), 1).await;

    let (client, _) = memory_client(&api_root(&server));
    client.queue().enqueue(WriteMethod::Post, "/clientes/", Some(json!({"nombre": "Ana"}))).await;
    client.queue().enqueue(WriteMethod::Put, "/clientes/1", Some(json!({"nombre": "Eva"}))).await;
    client.queue().enqueue(WriteMethod::Delete, "/clientes/2", None).await;
    let before = client.queue().read_all().await;

    let outcome = client.sync_now().await;

    let result = assert_matches!(outcome, DrainOutcome::Completed(result) => result);
    assert_eq!(result.succeeded, 2);
    assert_eq!(result.failed, 1);
    assert_eq!(client.queue().read_all().await, vec![before[1].clone()]);
}

#[tokio::test]
async fn test_full_success_clears_queue_and_notifies() {
    let server = MockServer::start().await;
    mount_sync(&server, batch_reply(&[true, true]), 1).await;

    let (client, _) = memory_client(&api_root(&server));
    client.queue().enqueue(WriteMethod::Post, "/ordenes/", Some(json!({"cliente": 1}))).await;
    client.queue().enqueue(WriteMethod::Post, "/ordenes/", Some(json!({"cliente": 2}))).await;
    let mut events = client.subscribe();

    client.sync_now().await;

    assert_eq!(client.pending_count().await, 0);
    let events = drain_events(&mut events);
    assert!(events.contains(&SyncEvent::Notification(Notification::success(
        "Sync complete: 2/2 operations succeeded"
    ))));
    assert!(!events
        .iter()
        .any(|event| matches!(event, SyncEvent::Notification(n) if n.level == NotificationLevel::Warning)));
    assert_eq!(
        events.last(),
        Some(&SyncEvent::IndicatorChanged { indicator: Indicator::Idle })
    );
}

#[tokio::test]
async fn test_partial_success_reports_both_notifications() {
    let server = MockServer::start().await;
    mount_sync(&server, batch_reply(&[false, true]), 1).await;

    let (client, _) = memory_client(&api_root(&server));
    client.queue().enqueue(WriteMethod::Post, "/a", None).await;
    client.queue().enqueue(WriteMethod::Post, "/b", None).await;
    let mut events = client.subscribe();

    client.sync_now().await;

    let levels: Vec<NotificationLevel> = drain_events(&mut events)
        .into_iter()
        .filter_map(|event| match event {
            SyncEvent::Notification(n) => Some(n.level),
            _ => None,
        })
        .collect();
    assert_eq!(levels, vec![NotificationLevel::Success, NotificationLevel::Warning]);
    crate::assert_queue_paths!(client.queue(), ["/api/a"]);
}

#[tokio::test]
async fn test_transport_failure_preserves_queue_bytes() {
    let (client, store) = memory_client(&unreachable_api_root());
    client.queue().enqueue(WriteMethod::Post, "/clientes/", Some(json!({"nombre": "Ana"}))).await;
    client.queue().enqueue(WriteMethod::Delete, "/clientes/9", None).await;
    let before = store.get("cola_sync").await.unwrap();

    let outcome = client.sync_now().await;

    assert_eq!(outcome, DrainOutcome::Unreachable);
    assert_eq!(store.get("cola_sync").await.unwrap(), before);
    assert_eq!(client.state().status(), ConnectionStatus::Offline);
    assert!(!client.state().is_syncing());
}

#[tokio::test]
async fn test_concurrent_drains_send_one_batch() {
    let server = MockServer::start().await;
    mount_slow_sync(&server, batch_reply(&[true]), Duration::from_millis(300), 1).await;

    let (client, _) = memory_client(&api_root(&server));
    client.queue().enqueue(WriteMethod::Post, "/facturas/", Some(json!({"total": 99}))).await;

    let (first, second) = tokio::join!(client.sync_now(), client.sync_now());

    let outcomes = [first, second];
    assert_eq!(
        outcomes.iter().filter(|o| matches!(o, DrainOutcome::Completed(_))).count(),
        1
    );
    assert!(outcomes.contains(&DrainOutcome::AlreadyRunning));
    assert_eq!(received_batches(&server).await.len(), 1);
}

#[tokio::test]
async fn test_enqueue_during_flight_is_kept() {
    let server = MockServer::start().await;
    mount_slow_sync(&server, batch_reply(&[true]), Duration::from_millis(300), 1).await;

    let (client, _) = memory_client(&api_root(&server));
    client.queue().enqueue(WriteMethod::Post, "/clientes/", None).await;

    let engine = client.engine().clone();
    let drain = tokio::spawn(async move { engine.drain().await });

    tokio::time::sleep(Duration::from_millis(100)).await;
    client.queue().enqueue(WriteMethod::Put, "/clientes/5", Some(json!({"nombre": "Luz"}))).await;

    assert_matches!(drain.await.unwrap(), DrainOutcome::Completed(_));
    crate::assert_queue_paths!(client.queue(), ["/api/clientes/5"]);
}

#[tokio::test]
async fn test_missing_result_keeps_operation() {
    let server = MockServer::start().await;
    mount_sync(
        &server,
        json!({"ok": true, "total": 2, "exitosas": 1, "fallidas": 0, "resultados": [{"ok": true}]}),
        1,
    )
    .await;

    let (client, _) = memory_client(&api_root(&server));
    client.queue().enqueue(WriteMethod::Post, "/a", None).await;
    client.queue().enqueue(WriteMethod::Post, "/b", None).await;

    client.sync_now().await;

    crate::assert_queue_paths!(client.queue(), ["/api/b"]);
}

#[tokio::test]
async fn test_rejected_batch_leaves_queue_and_state() {
    let server = MockServer::start().await;
    mount_sync(&server, json!({"ok": false, "error": "Formato de sincronización inválido"}), 1).await;

    let (client, _) = memory_client(&api_root(&server));
    client.queue().enqueue(WriteMethod::Post, "/a", None).await;
    let mut events = client.subscribe();

    let outcome = client.sync_now().await;

    assert_eq!(
        outcome,
        DrainOutcome::Rejected {
            error: "Formato de sincronización inválido".to_string()
        }
    );
    assert_eq!(client.pending_count().await, 1);
    assert!(client.state().is_online());
    assert!(drain_events(&mut events).contains(&SyncEvent::Notification(Notification::error(
        "Sync failed: Formato de sincronización inválido"
    ))));
}

#[tokio::test]
async fn test_batch_body_matches_queue() {
    let server = MockServer::start().await;
    mount_sync(&server, batch_reply(&[true]), 1).await;

    let (client, _) = memory_client(&api_root(&server));
    client.queue().enqueue(WriteMethod::Post, "/clientes/", Some(json!({"nombre": "Ana"}))).await;
    let queued = client.queue().read_all().await;

    client.sync_now().await;

    let batches = received_batches(&server).await;
    assert_eq!(batches[0], json!({"operaciones": serde_json::to_value(&queued).unwrap()}));
}
