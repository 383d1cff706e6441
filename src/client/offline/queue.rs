//! # Operation Queue
//!
//! Durable, ordered list of write operations that could not reach the
//! backend. The whole list is stored as one JSON array under a single
//! storage key and rewritten on every change.
//!
//! ## Features
//!
//! - **Persistent Queue**: operations survive restarts
//! - **Strict FIFO**: insertion order is replay order
//! - **Serialized Mutation**: read-modify-write sequences hold an async lock,
//!   so an enqueue racing a drain reconciliation is never lost
//! - **Forgiving Reads**: absent or corrupt storage reads as an empty queue
//! - **No Blind Overwrites**: a mutation that cannot read the stored list
//!   leaves it alone
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use gestion_sync::client::local_db::MemoryStore;
//! use gestion_sync::client::offline::QueueStore;
//! use gestion_sync::shared::operation::WriteMethod;
//!
//! # async fn example() {
//! let queue = QueueStore::new(Arc::new(MemoryStore::new()), "cola_sync", "/api");
//! queue.enqueue(WriteMethod::Post, "/clientes/", Some(serde_json::json!({"nombre": "Ana"}))).await;
//!
//! let pending = queue.read_all().await;
//! assert_eq!(pending[0].path, "/api/clientes/");
//! # }
//! ```

use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::client::local_db::KeyValueStore;
use crate::client::sync::sync_state::Notifier;
use crate::shared::error::Result;
use crate::shared::event::SyncEvent;
use crate::shared::operation::{PendingOperation, WriteMethod};

/// Durable queue of pending write operations
pub struct QueueStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
    prefix: String,
    /// Serializes read-modify-write sequences on the persisted list
    lock: Mutex<()>,
    notifier: Option<Notifier>,
}

impl std::fmt::Debug for QueueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueStore")
            .field("key", &self.key)
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl QueueStore {
    /// Create a queue stored under `key`, prefixing enqueued paths with `prefix`
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            prefix: prefix.into(),
            lock: Mutex::new(()),
            notifier: None,
        }
    }

    /// Publish queue changes and indicator refreshes through `notifier`
    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Backend-absolute form of a caller-relative path
    pub fn absolute_path(&self, path: &str) -> String {
        if self.prefix.is_empty() || path.starts_with(&format!("{}/", self.prefix)) || path == self.prefix {
            return path.to_string();
        }
        if path.starts_with('/') {
            format!("{}{}", self.prefix, path)
        } else {
            format!("{}/{}", self.prefix, path)
        }
    }

    /// Append a write to the queue
    ///
    /// Returns the queue length afterwards. A persistence failure is logged
    /// and otherwise swallowed; the returned length then reflects what is
    /// actually stored. When the stored list cannot be read the write is
    /// dropped rather than persisted over it, and 0 is returned.
    pub async fn enqueue(&self, method: WriteMethod, path: &str, body: Option<Value>) -> usize {
        let operation = PendingOperation::new(method, self.absolute_path(path), body);
        let path = operation.path.clone();

        let pending = {
            let _guard = self.lock.lock().await;
            let mut operations = match self.try_load().await {
                Ok(operations) => operations,
                Err(e) => {
                    tracing::error!(%method, path = %path, error = %e, "[STORE] Queue storage unreadable, operation not queued");
                    return 0;
                }
            };
            operations.push(operation);

            match self.persist(&operations).await {
                Ok(()) => operations.len(),
                Err(e) => {
                    tracing::error!(%method, path = %path, error = %e, "[STORE] Failed to persist queued operation");
                    operations.len() - 1
                }
            }
        };

        tracing::info!(%method, path = %path, pending, "[STORE] Operation queued");

        if let Some(notifier) = &self.notifier {
            notifier.events().publish(SyncEvent::OperationQueued {
                method,
                path,
                pending,
            });
            notifier.refresh_indicator(pending);
        }

        pending
    }

    /// Current ordered list, empty when storage is absent or unreadable
    pub async fn read_all(&self) -> Vec<PendingOperation> {
        self.load().await
    }

    /// Overwrite the persisted list
    pub async fn replace_all(&self, operations: &[PendingOperation]) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.persist(operations).await
    }

    /// Atomic read-modify-write of the persisted list
    ///
    /// `f` receives the current list and returns the new one. No enqueue can
    /// interleave between the read and the write. Returns the new length.
    /// A storage read error is returned without calling `f`.
    pub async fn update<F>(&self, f: F) -> Result<usize>
    where
        F: FnOnce(Vec<PendingOperation>) -> Vec<PendingOperation>,
    {
        let _guard = self.lock.lock().await;
        let current = self.try_load().await?;
        let next = f(current);
        self.persist(&next).await?;
        Ok(next.len())
    }

    pub async fn count(&self) -> usize {
        self.read_all().await.len()
    }

    async fn load(&self) -> Vec<PendingOperation> {
        self.try_load().await.unwrap_or_else(|e| {
            tracing::warn!(key = %self.key, error = %e, "[STORE] Queue storage unavailable, treating as empty");
            Vec::new()
        })
    }

    /// Stored list; absent or corrupt data is empty, a read error is not
    async fn try_load(&self) -> Result<Vec<PendingOperation>> {
        let Some(raw) = self.store.get(&self.key).await? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str(&raw) {
            Ok(operations) => Ok(operations),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "[STORE] Stored queue is corrupt, treating as empty");
                Ok(Vec::new())
            }
        }
    }

    async fn persist(&self, operations: &[PendingOperation]) -> Result<()> {
        let raw = serde_json::to_string(operations)?;
        self.store.set(&self.key, &raw).await
    }
}
