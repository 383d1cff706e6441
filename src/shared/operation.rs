/**
 * Pending Operations and Batch Wire Types
 *
 * This module defines the write intents that are queued while the backend is
 * unreachable, together with the request/response shapes of the backend's
 * batch-sync endpoint (`POST {api_root}/sync`).
 *
 * The backend speaks Spanish on the wire (`metodo`, `ruta`, `datos`,
 * `exitosas`, ...). Field names here are English and the wire keys are kept
 * through `#[serde(rename)]`, so the persisted queue, the batch body and the
 * transfer file all share one JSON shape.
 */
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::shared::error::SyncError;

/// HTTP verb accepted by the request gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

/// HTTP verb of a queued write
///
/// `GET` has no variant here: reads are never queued, and the type keeps it
/// that way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WriteMethod {
    Post,
    Put,
    Delete,
    Patch,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
        }
    }
}

impl WriteMethod {
    pub fn as_str(self) -> &'static str {
        Method::from(self).as_str()
    }
}

impl From<WriteMethod> for Method {
    fn from(method: WriteMethod) -> Self {
        match method {
            WriteMethod::Post => Method::Post,
            WriteMethod::Put => Method::Put,
            WriteMethod::Delete => Method::Delete,
            WriteMethod::Patch => Method::Patch,
        }
    }
}

impl TryFrom<Method> for WriteMethod {
    type Error = SyncError;

    fn try_from(method: Method) -> Result<Self, Self::Error> {
        match method {
            Method::Get => Err(SyncError::application("GET requests are never queued")),
            Method::Post => Ok(WriteMethod::Post),
            Method::Put => Ok(WriteMethod::Put),
            Method::Delete => Ok(WriteMethod::Delete),
            Method::Patch => Ok(WriteMethod::Patch),
        }
    }
}

impl std::str::FromStr for Method {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "PATCH" => Ok(Method::Patch),
            other => Err(SyncError::application(format!("unsupported HTTP method: {}", other))),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for WriteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One user-intended write that could not reach the backend
///
/// The path is stored in its backend-absolute form (API prefix included) so
/// the operation can be replayed verbatim through the batch endpoint.
///
/// # Example
/// ```rust
/// use gestion_sync::shared::operation::{PendingOperation, WriteMethod};
///
/// let op = PendingOperation::new(
///     WriteMethod::Post,
///     "/api/clientes/",
///     Some(serde_json::json!({"nombre": "Ana"})),
/// );
/// assert_eq!(op.path, "/api/clientes/");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOperation {
    /// HTTP verb of the write
    #[serde(rename = "metodo")]
    pub method: WriteMethod,
    /// Backend-absolute resource path
    #[serde(rename = "ruta")]
    pub path: String,
    /// JSON body, `None` for bodiless writes such as DELETE
    #[serde(rename = "datos", default)]
    pub body: Option<serde_json::Value>,
    /// RFC3339 time the write was queued
    #[serde(rename = "timestamp")]
    pub enqueued_at: String,
}

impl PendingOperation {
    /// Create an operation stamped with the current UTC time
    pub fn new(method: WriteMethod, path: impl Into<String>, body: Option<serde_json::Value>) -> Self {
        Self {
            method,
            path: path.into(),
            body: body.filter(|value| !value.is_null()),
            enqueued_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// One entry of a batch body
///
/// Queued operations are submitted typed; imported ones are forwarded as
/// the raw JSON the exporter wrote.
pub trait BatchEntry: Serialize + Sync {
    /// Backend path the entry targets, when it has one
    fn route(&self) -> Option<&str>;
}

impl BatchEntry for PendingOperation {
    fn route(&self) -> Option<&str> {
        Some(&self.path)
    }
}

impl BatchEntry for serde_json::Value {
    fn route(&self) -> Option<&str> {
        self.get("ruta").and_then(serde_json::Value::as_str)
    }
}

/// Body of `POST {api_root}/sync`
#[derive(Debug, Serialize)]
pub struct BatchRequest<'a, T: BatchEntry> {
    #[serde(rename = "operaciones")]
    pub operations: &'a [T],
}

/// Per-operation outcome reported by the batch endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItemResult {
    #[serde(default)]
    pub ok: bool,
    #[serde(rename = "ruta", default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Reply of the batch endpoint
///
/// `ok: false` means the endpoint rejected the batch as a whole, in which
/// case only `error` is meaningful.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub total: usize,
    #[serde(rename = "exitosas", default)]
    pub succeeded: usize,
    #[serde(rename = "fallidas", default)]
    pub failed: usize,
    #[serde(rename = "resultados", default)]
    pub results: Vec<BatchItemResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of one successful batch attempt
///
/// `results` is positionally aligned with the submitted batch: entry `i`
/// describes operation `i`. Positions the backend did not report are filled
/// in as failures so that no intent is dropped without an acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncResult {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<BatchItemResult>,
}

impl SyncResult {
    /// Align a backend reply with the batch that produced it
    pub fn from_response<T: BatchEntry>(response: BatchResponse, submitted: &[T]) -> Self {
        if response.results.len() != submitted.len() {
            tracing::warn!(
                submitted = submitted.len(),
                reported = response.results.len(),
                "[SYNC] Batch reply is not aligned with the submitted operations"
            );
        }

        let mut reported = response.results.into_iter();
        let results = submitted
            .iter()
            .map(|op| {
                reported.next().unwrap_or_else(|| BatchItemResult {
                    ok: false,
                    path: op.route().map(str::to_string),
                    error: Some("no result reported for this operation".to_string()),
                })
            })
            .collect();

        Self {
            total: response.total,
            succeeded: response.succeeded,
            failed: response.failed,
            results,
        }
    }

    /// Positions of the operations the backend did not accept
    pub fn failed_positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.results
            .iter()
            .enumerate()
            .filter(|(_, result)| !result.ok)
            .map(|(index, _)| index)
    }

    /// Failed entries paired with the path they refer to
    pub fn failures<'a, T: BatchEntry>(
        &'a self,
        submitted: &'a [T],
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.failed_positions().map(move |index| {
            let result = &self.results[index];
            let path = result
                .path
                .as_deref()
                .or_else(|| submitted.get(index).and_then(BatchEntry::route))
                .unwrap_or("?");
            (path, result.error.as_deref().unwrap_or("unknown error"))
        })
    }
}
