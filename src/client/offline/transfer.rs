//! # Queue Transfer
//!
//! Moves pending operations between two client instances that cannot reach
//! the same backend, e.g. an offline-only deployment and one next to the
//! backend.
//!
//! ## Flow
//!
//! 1. **Export** on the source instance: the local queue is wrapped in a
//!    `TransferDocument` and written as `sync_data_YYYY-MM-DD.json`. The
//!    local queue is left as it is.
//! 2. **Import** on the target instance: the document is validated, the
//!    user confirms from an `ImportPreview`, and the operations are sent
//!    straight to the batch endpoint. The target's own queue is never
//!    touched, and nothing is queued when the backend is unreachable.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::client::api::BackendClient;
use crate::client::offline::QueueStore;
use crate::shared::error::{Result, SyncError};
use crate::shared::event::{EventBus, Notification, SyncEvent};
use crate::shared::operation::{PendingOperation, SyncResult};

/// Format version written into exported documents
pub const TRANSFER_VERSION: &str = "1.0";

/// Portable representation of a queue
///
/// Entries are kept as the JSON the exporter wrote and forwarded to the
/// batch endpoint unchanged, so fields this client does not know about
/// survive the trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferDocument {
    #[serde(default = "default_version")]
    pub version: String,
    /// RFC3339 export time
    #[serde(rename = "fecha_exportacion", default)]
    pub exported_at: Option<String>,
    /// Operation count as written by the exporter
    #[serde(rename = "total_operaciones", default)]
    pub declared_count: Option<usize>,
    #[serde(rename = "operaciones")]
    pub operations: Vec<Value>,
}

fn default_version() -> String {
    TRANSFER_VERSION.to_string()
}

impl TransferDocument {
    /// Wrap a queue snapshot, stamped with the current time
    pub fn new(operations: &[PendingOperation]) -> Result<Self> {
        let operations = operations
            .iter()
            .map(serde_json::to_value)
            .collect::<serde_json::Result<Vec<_>>>()?;

        Ok(Self {
            version: TRANSFER_VERSION.to_string(),
            exported_at: Some(chrono::Utc::now().to_rfc3339()),
            declared_count: Some(operations.len()),
            operations,
        })
    }

    /// Parse and validate an import file
    ///
    /// Rejects invalid JSON, a missing or non-array `operaciones`, an empty
    /// operation list, and entries that are not JSON objects. Entry fields
    /// are left for the backend to judge.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| SyncError::malformed_transfer(format!("the file is not valid JSON ({})", e)))?;

        match value.get("operaciones") {
            Some(Value::Array(operations)) if operations.is_empty() => {
                return Err(SyncError::malformed_transfer("the file contains no pending operations"));
            }
            Some(Value::Array(operations)) => {
                if let Some(position) = operations.iter().position(|op| !op.is_object()) {
                    return Err(SyncError::malformed_transfer(format!(
                        "invalid operation entry at position {}",
                        position + 1
                    )));
                }
            }
            _ => {
                return Err(SyncError::malformed_transfer("the file does not contain sync operations"));
            }
        }

        let document: TransferDocument = serde_json::from_value(value)
            .map_err(|e| SyncError::malformed_transfer(format!("the file is not a transfer document ({})", e)))?;

        if document.version != TRANSFER_VERSION {
            tracing::warn!(version = %document.version, "[TRANSFER] Unknown transfer format version, importing anyway");
        }
        if let Some(declared) = document.declared_count {
            if declared != document.operations.len() {
                tracing::warn!(
                    declared,
                    actual = document.operations.len(),
                    "[TRANSFER] Declared operation count does not match the file"
                );
            }
        }

        Ok(document)
    }

    /// What the user is asked to confirm
    pub fn preview(&self, file_name: impl Into<String>) -> ImportPreview {
        ImportPreview {
            file_name: file_name.into(),
            exported_at: self.exported_at.clone().unwrap_or_else(|| "unknown".to_string()),
            declared_count: self.declared_count,
            operation_count: self.operations.len(),
        }
    }

    /// Deterministic file name for an export made today (UTC)
    pub fn file_name() -> String {
        format!("sync_data_{}.json", chrono::Utc::now().format("%Y-%m-%d"))
    }
}

/// Summary shown before an import is submitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportPreview {
    pub file_name: String,
    /// Export timestamp, or `"unknown"`
    pub exported_at: String,
    pub declared_count: Option<usize>,
    pub operation_count: usize,
}

impl fmt::Display for ImportPreview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "File: {}", self.file_name)?;
        writeln!(f, "Exported: {}", self.exported_at)?;
        match self.declared_count {
            Some(declared) if declared != self.operation_count => {
                write!(f, "Operations: {} (declared {})", self.operation_count, declared)
            }
            _ => write!(f, "Operations: {}", self.operation_count),
        }
    }
}

/// Result of an export attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// The queue was empty; no file was written
    NothingToExport,
    Exported { path: PathBuf, count: usize },
}

/// One operation the backend rejected during an import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportFailure {
    pub path: String,
    pub error: String,
}

/// Backend verdict on an imported batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub result: SyncResult,
    pub failures: Vec<ImportFailure>,
}

impl ImportReport {
    fn new(result: SyncResult, submitted: &[Value]) -> Self {
        let failures = result
            .failures(submitted)
            .map(|(path, error)| ImportFailure {
                path: path.to_string(),
                error: error.to_string(),
            })
            .collect();
        Self { result, failures }
    }

    /// Multi-line summary with one line per rejected operation
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Import complete:\n  Total: {}\n  Succeeded: {}",
            self.result.total, self.result.succeeded
        );
        if !self.failures.is_empty() {
            summary.push_str(&format!("\n  Failed: {}", self.failures.len()));
            for failure in &self.failures {
                summary.push_str(&format!("\n    {}: {}", failure.path, failure.error));
            }
        }
        summary
    }
}

/// Result of an import attempt that did not fail outright
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// The user declined the preview; nothing was sent
    Cancelled,
    Completed(ImportReport),
}

/// Export and import of transfer documents
#[derive(Debug, Clone)]
pub struct TransferService {
    backend: BackendClient,
    queue: Arc<QueueStore>,
    events: EventBus,
    export_dir: PathBuf,
}

impl TransferService {
    pub fn new(backend: BackendClient, queue: Arc<QueueStore>, events: EventBus, export_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            queue,
            events,
            export_dir: export_dir.into(),
        }
    }

    /// Snapshot of the local queue, `None` when it is empty
    pub async fn export_document(&self) -> Result<Option<TransferDocument>> {
        let operations = self.queue.read_all().await;
        if operations.is_empty() {
            return Ok(None);
        }
        TransferDocument::new(&operations).map(Some)
    }

    /// Export into the configured directory
    pub async fn export(&self) -> Result<ExportOutcome> {
        let dir = self.export_dir.clone();
        self.export_to_dir(&dir).await
    }

    /// Write the queue to `dir/sync_data_YYYY-MM-DD.json`
    ///
    /// An existing file of the same name is overwritten.
    pub async fn export_to_dir(&self, dir: &Path) -> Result<ExportOutcome> {
        let Some(document) = self.export_document().await? else {
            tracing::info!("[TRANSFER] Nothing to export");
            self.events
                .notify(Notification::info("There are no pending operations to export."));
            return Ok(ExportOutcome::NothingToExport);
        };

        let json = serde_json::to_string_pretty(&document)?;
        let file_name = TransferDocument::file_name();
        let path = dir.join(&file_name);

        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(&path, json).await?;

        let count = document.operations.len();
        tracing::info!(count, path = %path.display(), "[TRANSFER] Queue exported");
        self.events.notify(Notification::success(format!(
            "Exported {} operations to {}. Import this file on the connected instance to sync them.",
            count, file_name
        )));

        Ok(ExportOutcome::Exported { path, count })
    }

    /// Import a transfer file from disk
    pub async fn import_file<F>(&self, path: &Path, confirm: F) -> Result<ImportOutcome>
    where
        F: FnOnce(&ImportPreview) -> bool,
    {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.import_bytes(&file_name, &bytes, confirm).await
    }

    /// Validate, confirm and submit a transfer document
    ///
    /// # Errors
    ///
    /// - `MalformedTransfer` before anything is sent
    /// - `Transport` when the batch endpoint cannot be reached
    /// - `Application` when the endpoint rejects the batch
    pub async fn import_bytes<F>(&self, file_name: &str, bytes: &[u8], confirm: F) -> Result<ImportOutcome>
    where
        F: FnOnce(&ImportPreview) -> bool,
    {
        let document = match TransferDocument::parse(bytes) {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!(file = file_name, error = %e, "[TRANSFER] Rejected import file");
                self.events.notify(Notification::error(e.user_message()));
                return Err(e);
            }
        };

        let preview = document.preview(file_name);
        if !confirm(&preview) {
            tracing::info!(file = file_name, "[TRANSFER] Import cancelled");
            return Ok(ImportOutcome::Cancelled);
        }

        tracing::info!(file = file_name, count = document.operations.len(), "[TRANSFER] Submitting imported operations");

        let response = match self.backend.submit_batch(&document.operations).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "[TRANSFER] Backend unreachable during import");
                let error = SyncError::transport(format!("could not reach backend: {}", e));
                self.events.notify(Notification::error(error.user_message()));
                return Err(error);
            }
        };

        if !response.ok {
            let message = response
                .error
                .unwrap_or_else(|| "the server rejected the sync request".to_string());
            tracing::error!(error = %message, "[TRANSFER] Import rejected");
            self.events
                .notify(Notification::error(format!("Sync failed: {}", message)));
            return Err(SyncError::application(message));
        }

        let report = ImportReport::new(SyncResult::from_response(response, &document.operations), &document.operations);

        tracing::info!(
            total = report.result.total,
            succeeded = report.result.succeeded,
            failed = report.failures.len(),
            "[TRANSFER] Import processed"
        );

        let notification = if report.failures.is_empty() {
            Notification::success(report.summary())
        } else {
            Notification::warning(report.summary())
        };
        self.events.notify(notification);
        self.events.publish(SyncEvent::RefreshRequested);

        Ok(ImportOutcome::Completed(report))
    }
}
