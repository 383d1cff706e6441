//! Request gateway tests
//!
//! Replies pass through untouched; transport failures queue writes but
//! never reads.

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gestion_sync::client::gateway::{
    GatewayResponse, DELETE_QUEUED_MESSAGE, OPERATION_QUEUED_MESSAGE, SAVED_OFFLINE_MESSAGE, UNREACHABLE_MESSAGE,
};
use gestion_sync::client::{BackendClient, RequestGateway};
use gestion_sync::shared::event::{Indicator, SyncEvent};
use gestion_sync::shared::operation::{Method, WriteMethod};

use crate::common::{api_root, drain_events, memory_client, test_config, unreachable_api_root};

#[tokio::test]
async fn test_backend_reply_is_returned_as_is() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/clientes/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"ok": true, "mensaje": "Cliente creado", "id": 7})))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = memory_client(&api_root(&server));
    let reply = client.gateway().post("/clientes/", json!({"nombre": "Ana"})).await;

    assert!(reply.is_ok());
    assert!(!reply.is_offline());
    assert_eq!(reply.message(), Some("Cliente creado"));
    assert_eq!(reply.to_json()["id"], 7);
    assert_eq!(client.pending_count().await, 0);
}

#[tokio::test]
async fn test_application_error_is_not_queued() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/facturas/3"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"ok": false, "error": "Factura cerrada"})))
        .mount(&server)
        .await;

    let (client, _) = memory_client(&api_root(&server));
    let reply = client.gateway().put("/facturas/3", json!({"total": 10})).await;

    assert!(!reply.is_ok());
    assert_eq!(reply.error(), Some("Factura cerrada"));
    assert_eq!(client.pending_count().await, 0);
}

#[tokio::test]
async fn test_unreachable_write_is_queued_with_absolute_path() {
    let (client, _) = memory_client(&unreachable_api_root());
    let mut events = client.subscribe();

    let reply = client.gateway().post("/clientes/", json!({"nombre": "Ana"})).await;

    assert_matches!(&reply, GatewayResponse::Queued { message } if message == SAVED_OFFLINE_MESSAGE);
    assert_eq!(
        reply.to_json(),
        json!({"ok": true, "offline": true, "mensaje": SAVED_OFFLINE_MESSAGE})
    );

    let queued = client.queue().read_all().await;
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].method, WriteMethod::Post);
    assert_eq!(queued[0].path, "/api/clientes/");
    assert_eq!(queued[0].body, Some(json!({"nombre": "Ana"})));

    let events = drain_events(&mut events);
    assert!(events.contains(&SyncEvent::OperationQueued {
        method: WriteMethod::Post,
        path: "/api/clientes/".to_string(),
        pending: 1,
    }));
    assert!(events.contains(&SyncEvent::IndicatorChanged {
        indicator: Indicator::Pending(1)
    }));
}

#[tokio::test]
async fn test_unreachable_read_is_never_queued() {
    let (client, _) = memory_client(&unreachable_api_root());

    let reply = client.gateway().get("/clientes/").await;

    assert_matches!(&reply, GatewayResponse::Unreachable { .. });
    assert_eq!(reply.error(), Some(UNREACHABLE_MESSAGE));
    assert_eq!(client.pending_count().await, 0);

    let reply = client.gateway().request(Method::Get, "/facturas/", None).await;
    assert!(!reply.is_ok());
    assert_eq!(client.pending_count().await, 0);
}

#[tokio::test]
async fn test_queued_messages_per_verb() {
    let (client, _) = memory_client(&unreachable_api_root());

    let reply = client.gateway().delete("/clientes/4").await;
    assert_eq!(reply.message(), Some(DELETE_QUEUED_MESSAGE));

    let reply = client
        .gateway()
        .request(Method::Patch, "/ordenes/2", Some(json!({"estado": "cerrada"})))
        .await;
    assert_eq!(reply.message(), Some(OPERATION_QUEUED_MESSAGE));

    let queued = client.queue().read_all().await;
    assert_eq!(queued.len(), 2);
    assert_eq!(queued[0].body, None);
    assert_eq!(queued[1].method, WriteMethod::Patch);
}

#[tokio::test]
async fn test_non_json_reply_queues_write() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ofertas/"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let (client, _) = memory_client(&api_root(&server));
    let reply = client.gateway().post("/ofertas/", json!({"importe": 120})).await;

    assert!(reply.is_offline());
    assert_eq!(client.pending_count().await, 1);
}

#[tokio::test]
async fn test_gateway_without_queue_reports_unreachable() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&unreachable_api_root(), dir.path());
    let gateway = RequestGateway::without_queue(BackendClient::new(&config).unwrap());

    assert!(!gateway.can_queue());
    let reply = gateway.post("/clientes/", json!({"nombre": "Ana"})).await;
    assert_matches!(reply, GatewayResponse::Unreachable { .. });
}
