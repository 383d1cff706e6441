//! Export/import tests
//!
//! Export writes a transfer document without touching the queue; import
//! validates, confirms, and submits straight to the batch endpoint.

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::cell::Cell;
use wiremock::MockServer;

use gestion_sync::client::offline::{ExportOutcome, ImportOutcome, TransferDocument};
use gestion_sync::shared::error::SyncError;
use gestion_sync::shared::event::SyncEvent;
use gestion_sync::shared::operation::WriteMethod;

use crate::common::{
    api_root, batch_reply, drain_events, memory_client, mount_sync, received_batches, sqlite_client,
    unreachable_api_root,
};

#[tokio::test]
async fn test_export_empty_queue_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let (client, _) = memory_client(&unreachable_api_root());

    let outcome = client.transfer().export_to_dir(dir.path()).await.unwrap();

    assert_eq!(outcome, ExportOutcome::NothingToExport);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_export_writes_document_and_keeps_queue() {
    let dir = tempfile::tempdir().unwrap();
    let (client, _) = memory_client(&unreachable_api_root());
    client.queue().enqueue(WriteMethod::Post, "/clientes/", Some(json!({"nombre": "Ana"}))).await;
    client.queue().enqueue(WriteMethod::Delete, "/facturas/2", None).await;

    let outcome = client.transfer().export_to_dir(dir.path()).await.unwrap();

    let (path, count) = assert_matches!(outcome, ExportOutcome::Exported { path, count } => (path, count));
    assert_eq!(count, 2);
    let file_name = path.file_name().unwrap().to_string_lossy().into_owned();
    crate::assert_contains!(file_name, "sync_data_");

    let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written["version"], "1.0");
    assert_eq!(written["total_operaciones"], 2);
    assert_eq!(written["operaciones"][0]["ruta"], "/api/clientes/");
    assert_eq!(written["operaciones"][1]["datos"], Value::Null);

    assert_eq!(client.pending_count().await, 2);
}

#[tokio::test]
async fn test_import_rejects_missing_operations_without_side_effects() {
    let server = MockServer::start().await;
    let (client, _) = memory_client(&api_root(&server));
    client.queue().enqueue(WriteMethod::Post, "/local", None).await;
    let asked = Cell::new(false);

    let result = client
        .transfer()
        .import_bytes("sync_data.json", br#"{"version": "1.0", "total_operaciones": 0}"#, |_| {
            asked.set(true);
            true
        })
        .await;

    assert_matches!(result, Err(SyncError::MalformedTransfer { .. }));
    assert!(!asked.get());
    assert!(server.received_requests().await.unwrap().is_empty());
    assert_eq!(client.pending_count().await, 1);
}

#[tokio::test]
async fn test_import_rejects_invalid_json_and_empty_list() {
    let (client, _) = memory_client(&unreachable_api_root());

    let invalid = client.transfer().import_bytes("x.json", b"{oops", |_| true).await.unwrap_err();
    crate::assert_contains!(invalid.user_message(), "not valid JSON");

    let empty = client
        .transfer()
        .import_bytes("x.json", br#"{"operaciones": []}"#, |_| true)
        .await
        .unwrap_err();
    crate::assert_contains!(empty.user_message(), "no pending operations");
}

#[tokio::test]
async fn test_cancelled_import_sends_nothing() {
    let server = MockServer::start().await;
    let (client, _) = memory_client(&api_root(&server));
    let document = TransferDocument::new(&[gestion_sync::shared::operation::PendingOperation::new(
        WriteMethod::Post,
        "/api/clientes/",
        Some(json!({"nombre": "Ana"})),
    )])
    .unwrap();
    let bytes = serde_json::to_vec(&document).unwrap();

    let outcome = client
        .transfer()
        .import_bytes("sync_data_2026-10-19.json", &bytes, |preview| {
            assert_eq!(preview.operation_count, 1);
            assert_eq!(preview.declared_count, Some(1));
            assert_eq!(preview.file_name, "sync_data_2026-10-19.json");
            false
        })
        .await
        .unwrap();

    assert_eq!(outcome, ImportOutcome::Cancelled);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_import_reports_failures_and_requests_refresh() {
    let server = MockServer::start().await;
    mount_sync(
        &server,
        json!({
            "ok": true, "total": 2, "exitosas": 1, "fallidas": 1,
            "resultados": [{"ok": true, "ruta": "/api/clientes/"}, {"ok": false, "ruta": "/api/facturas/8", "error": "No existe"}]
        }),
        1,
    )
    .await;

    let (client, _) = memory_client(&api_root(&server));
    let mut events = client.subscribe();
    let file = json!({
        "version": "1.0",
        "fecha_exportacion": "2026-10-18T09:30:00+00:00",
        "total_operaciones": 2,
        "operaciones": [
            {"metodo": "POST", "ruta": "/api/clientes/", "datos": {"nombre": "Ana"}, "timestamp": "2026-10-18T09:00:00+00:00"},
            {"metodo": "DELETE", "ruta": "/api/facturas/8", "datos": null, "timestamp": "2026-10-18T09:10:00+00:00"}
        ]
    });

    let outcome = client
        .transfer()
        .import_bytes("sync_data_2026-10-18.json", file.to_string().as_bytes(), |preview| {
            preview.exported_at == "2026-10-18T09:30:00+00:00"
        })
        .await
        .unwrap();

    let report = assert_matches!(outcome, ImportOutcome::Completed(report) => report);
    assert_eq!(report.result.succeeded, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, "/api/facturas/8");
    assert_eq!(report.failures[0].error, "No existe");

    assert_eq!(received_batches(&server).await[0]["operaciones"], file["operaciones"]);
    assert_eq!(client.pending_count().await, 0);
    assert!(drain_events(&mut events).contains(&SyncEvent::RefreshRequested));
}

#[tokio::test]
async fn test_import_forwards_entries_unchanged() {
    let server = MockServer::start().await;
    mount_sync(&server, batch_reply(&[true, true]), 1).await;
    let (client, _) = memory_client(&api_root(&server));

    // Lowercase verb, no timestamp, and a field this client does not model
    let file = json!({
        "operaciones": [
            {"metodo": "post", "ruta": "/api/clientes/", "datos": {"nombre": "Ana"}},
            {"metodo": "DELETE", "ruta": "/api/ofertas/4", "timestamp": "2026-10-18T09:00:00Z", "origen": "tienda"}
        ]
    });

    let outcome = client
        .transfer()
        .import_bytes("sync_data_2026-10-18.json", file.to_string().as_bytes(), |_| true)
        .await
        .unwrap();

    assert_matches!(outcome, ImportOutcome::Completed(report) if report.failures.is_empty());
    assert_eq!(received_batches(&server).await[0]["operaciones"], file["operaciones"]);
}

#[tokio::test]
async fn test_import_transport_failure_is_not_queued() {
    let (client, _) = memory_client(&unreachable_api_root());
    let file = json!({"operaciones": [{"metodo": "PUT", "ruta": "/api/clientes/1", "datos": {"nombre": "Eva"}, "timestamp": "t"}]});

    let error = client
        .transfer()
        .import_bytes("f.json", file.to_string().as_bytes(), |_| true)
        .await
        .unwrap_err();

    assert!(error.is_transport());
    assert_eq!(client.pending_count().await, 0);
}

#[tokio::test]
async fn test_import_rejected_batch_is_application_error() {
    let server = MockServer::start().await;
    mount_sync(&server, json!({"ok": false, "error": "Base de datos bloqueada"}), 1).await;

    let (client, _) = memory_client(&api_root(&server));
    let file = json!({"operaciones": [{"metodo": "POST", "ruta": "/api/x", "datos": null, "timestamp": "t"}]});

    let error = client
        .transfer()
        .import_bytes("f.json", file.to_string().as_bytes(), |_| true)
        .await
        .unwrap_err();

    assert_matches!(error, SyncError::Application { message } if message == "Base de datos bloqueada");
}

#[tokio::test]
async fn test_export_from_one_instance_imports_into_another() {
    let offline_dir = tempfile::tempdir().unwrap();
    let offline = sqlite_client(&unreachable_api_root(), offline_dir.path()).await;
    offline.gateway().post("/clientes/", json!({"nombre": "Ana"})).await;
    offline.gateway().put("/ordenes/4", json!({"estado": "hecha"})).await;
    let queued = offline.queue().read_all().await;

    let outcome = offline.transfer().export().await.unwrap();
    let path = assert_matches!(outcome, ExportOutcome::Exported { path, .. } => path);
    assert!(path.starts_with(offline_dir.path()));

    let server = MockServer::start().await;
    mount_sync(&server, batch_reply(&[true, true]), 1).await;
    let connected_dir = tempfile::tempdir().unwrap();
    let connected = sqlite_client(&api_root(&server), connected_dir.path()).await;

    let outcome = connected.transfer().import_file(&path, |_| true).await.unwrap();

    assert_matches!(outcome, ImportOutcome::Completed(report) if report.failures.is_empty());
    assert_eq!(
        received_batches(&server).await[0]["operaciones"],
        serde_json::to_value(&queued).unwrap()
    );
    // The source keeps its copy until it syncs on its own
    assert_eq!(offline.pending_count().await, 2);
}
