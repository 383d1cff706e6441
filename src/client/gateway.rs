/**
 * Request Gateway
 *
 * Every call the application makes to the backend goes through here. Replies
 * are handed back untouched, whatever their status. When the backend cannot
 * be reached at all, a write is handed to the queue store and the caller gets
 * a success-shaped reply marked `offline`, so data entry is never lost.
 * Reads are never queued.
 *
 * Whether writes can be queued is decided when the gateway is built: with no
 * queue store, a failed write is reported like a failed read.
 */
use serde_json::{json, Value};
use std::sync::Arc;

use crate::client::api::BackendClient;
use crate::client::offline::QueueStore;
use crate::shared::error::SyncError;
use crate::shared::operation::{Method, WriteMethod};

/// Shown when a POST or PUT is queued
pub const SAVED_OFFLINE_MESSAGE: &str = "Saved offline. It will sync when the connection returns.";

/// Shown when a DELETE is queued
pub const DELETE_QUEUED_MESSAGE: &str = "Deletion queued. It will sync when the connection returns.";

/// Shown when any other write is queued
pub const OPERATION_QUEUED_MESSAGE: &str = "Operation queued. It will sync when the connection returns.";

/// Shown when nothing could be sent and nothing was queued
pub const UNREACHABLE_MESSAGE: &str = "Could not reach the server. Is the backend running?";

/// What the caller gets back from the gateway
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayResponse {
    /// The backend replied; its JSON body, as-is
    Backend(Value),
    /// Transport failure on a write; the write was queued
    Queued { message: String },
    /// Transport failure that could not be queued
    Unreachable { message: String },
}

impl GatewayResponse {
    /// Whether the caller should proceed as if the request succeeded
    pub fn is_ok(&self) -> bool {
        match self {
            GatewayResponse::Backend(value) => value.get("ok").and_then(Value::as_bool).unwrap_or(false),
            GatewayResponse::Queued { .. } => true,
            GatewayResponse::Unreachable { .. } => false,
        }
    }

    pub fn is_offline(&self) -> bool {
        matches!(self, GatewayResponse::Queued { .. })
    }

    /// Success message: the backend's `mensaje`, or the queued notice
    pub fn message(&self) -> Option<&str> {
        match self {
            GatewayResponse::Backend(value) => value.get("mensaje").and_then(Value::as_str),
            GatewayResponse::Queued { message } => Some(message),
            GatewayResponse::Unreachable { .. } => None,
        }
    }

    /// Error message: the backend's `error`, or the unreachable notice
    pub fn error(&self) -> Option<&str> {
        match self {
            GatewayResponse::Backend(value) => value.get("error").and_then(Value::as_str),
            GatewayResponse::Queued { .. } => None,
            GatewayResponse::Unreachable { message } => Some(message),
        }
    }

    /// The backend's `data` payload, if any
    pub fn data(&self) -> Option<&Value> {
        match self {
            GatewayResponse::Backend(value) => value.get("data"),
            _ => None,
        }
    }

    /// Render in the backend's own reply shape
    pub fn to_json(&self) -> Value {
        match self {
            GatewayResponse::Backend(value) => value.clone(),
            GatewayResponse::Queued { message } => json!({"ok": true, "offline": true, "mensaje": message}),
            GatewayResponse::Unreachable { message } => json!({"ok": false, "error": message}),
        }
    }
}

/// Outbound request wrapper with enqueue-on-failure
#[derive(Debug, Clone)]
pub struct RequestGateway {
    backend: BackendClient,
    queue: Option<Arc<QueueStore>>,
}

impl RequestGateway {
    /// Gateway that queues failed writes into `queue`
    pub fn new(backend: BackendClient, queue: Arc<QueueStore>) -> Self {
        Self {
            backend,
            queue: Some(queue),
        }
    }

    /// Gateway without a queue: failed writes are reported as unreachable
    pub fn without_queue(backend: BackendClient) -> Self {
        Self { backend, queue: None }
    }

    pub fn can_queue(&self) -> bool {
        self.queue.is_some()
    }

    pub async fn get(&self, path: &str) -> GatewayResponse {
        self.request(Method::Get, path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> GatewayResponse {
        self.request(Method::Post, path, Some(body)).await
    }

    pub async fn put(&self, path: &str, body: Value) -> GatewayResponse {
        self.request(Method::Put, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> GatewayResponse {
        self.request(Method::Delete, path, None).await
    }

    /// Verb-parameterized call
    ///
    /// Application-level errors (`ok: false`, HTTP error statuses) come back
    /// as `Backend` and are never queued or retried.
    pub async fn request(&self, method: Method, path: &str, body: Option<Value>) -> GatewayResponse {
        match self.backend.send(method, path, body.as_ref()).await {
            Ok(value) => GatewayResponse::Backend(value),
            Err(e) => self.on_failure(method, path, body, e).await,
        }
    }

    async fn on_failure(&self, method: Method, path: &str, body: Option<Value>, error: SyncError) -> GatewayResponse {
        tracing::warn!(%method, path, error = %error, "[GATEWAY] Request failed");

        let write = WriteMethod::try_from(method).ok();
        match (write, &self.queue) {
            (Some(write), Some(queue)) => {
                queue.enqueue(write, path, body).await;
                GatewayResponse::Queued {
                    message: queued_message(method).to_string(),
                }
            }
            _ => GatewayResponse::Unreachable {
                message: UNREACHABLE_MESSAGE.to_string(),
            },
        }
    }
}

fn queued_message(method: Method) -> &'static str {
    match method {
        Method::Post | Method::Put => SAVED_OFFLINE_MESSAGE,
        Method::Delete => DELETE_QUEUED_MESSAGE,
        _ => OPERATION_QUEUED_MESSAGE,
    }
}
