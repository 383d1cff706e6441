//! # Sync Module
//!
//! Replays the pending-operation queue against the backend.
//!
//! ## Components
//!
//! - **SyncEngine**: single-flight drain of the whole queue in one batch
//! - **sync_state**: connectivity flag, drain guard, indicator refresh
//! - **network_monitor**: reachability probing and the OFFLINE → ONLINE trigger
//! - **scheduler**: background probe loop driven by a timer and network signals
//!
//! ## Reconciliation
//!
//! The batch endpoint answers one result per submitted operation, in order.
//! After a drain the queue holds the operations whose result was not ok,
//! in their original order, followed by anything enqueued while the batch
//! was in flight. Accepted operations are dropped for good.
//!
//! ```text
//! queue:    [A, B, C]          submitted
//! results:  [ok, err, ok]
//! enqueued during flight: [D]
//! queue:    [B, D]
//! ```

pub mod network_monitor;
pub mod scheduler;
pub mod sync_state;

pub use network_monitor::{ConnectivityMonitor, NetworkSignal, ProbeOutcome};
pub use scheduler::MonitorHandle;
pub use sync_state::{ConnectivityState, Notifier, SyncGuard};

use std::sync::Arc;

use crate::client::api::BackendClient;
use crate::client::offline::QueueStore;
use crate::shared::error::SyncError;
use crate::shared::event::{ConnectionStatus, Notification};
use crate::shared::operation::{PendingOperation, SyncResult};

/// Result of one `drain()` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Nothing was queued; no request was made
    Empty,
    /// Another drain was in flight; this call did nothing
    AlreadyRunning,
    /// The batch endpoint could not be reached; the queue is untouched
    Unreachable,
    /// The endpoint refused the batch as a whole; the queue is untouched
    Rejected { error: String },
    /// The batch was processed
    Completed(SyncResult),
}

impl DrainOutcome {
    /// Error summary for a drain that did not fully succeed
    ///
    /// `Empty`, `AlreadyRunning` and fully accepted batches map to `None`.
    pub fn into_error(self) -> Option<SyncError> {
        match self {
            DrainOutcome::Empty | DrainOutcome::AlreadyRunning => None,
            DrainOutcome::Unreachable => Some(SyncError::transport("batch endpoint unreachable")),
            DrainOutcome::Rejected { error } => Some(SyncError::application(error)),
            DrainOutcome::Completed(result) => {
                let failed = result.failed_positions().count();
                (failed > 0).then_some(SyncError::PartialBatch {
                    failed,
                    total: result.results.len(),
                })
            }
        }
    }
}

/// Drains the queue into the backend's batch endpoint
#[derive(Debug)]
pub struct SyncEngine {
    backend: BackendClient,
    queue: Arc<QueueStore>,
    notifier: Notifier,
}

impl SyncEngine {
    pub fn new(backend: BackendClient, queue: Arc<QueueStore>, notifier: Notifier) -> Self {
        Self {
            backend,
            queue,
            notifier,
        }
    }

    pub fn state(&self) -> &Arc<ConnectivityState> {
        self.notifier.state()
    }

    /// Submit the whole queue as one batch and keep only what failed
    ///
    /// Concurrent calls while a drain is in flight return
    /// `DrainOutcome::AlreadyRunning` without touching the network.
    pub async fn drain(&self) -> DrainOutcome {
        let Some(_guard) = self.notifier.state().try_begin_sync() else {
            tracing::debug!("[SYNC] Drain already in flight, skipping");
            return DrainOutcome::AlreadyRunning;
        };

        let snapshot = self.queue.read_all().await;
        if snapshot.is_empty() {
            return DrainOutcome::Empty;
        }

        tracing::info!(pending = snapshot.len(), "[SYNC] Syncing pending operations");

        let response = match self.backend.submit_batch(&snapshot).await {
            Ok(response) => response,
            Err(e) => {
                tracing::info!(error = %e, "[SYNC] Backend unavailable, will retry later");
                self.notifier.set_status(ConnectionStatus::Offline);
                self.notifier.refresh_indicator(self.queue.count().await);
                return DrainOutcome::Unreachable;
            }
        };

        if !response.ok {
            let error = response
                .error
                .unwrap_or_else(|| "the server rejected the sync request".to_string());
            tracing::error!(error = %error, "[SYNC] Batch rejected");
            self.notifier
                .events()
                .notify(Notification::error(format!("Sync failed: {}", error)));
            self.notifier.refresh_indicator(snapshot.len());
            return DrainOutcome::Rejected { error };
        }

        let result = SyncResult::from_response(response, &snapshot);
        let retained: Vec<PendingOperation> = result
            .failed_positions()
            .map(|index| snapshot[index].clone())
            .collect();
        let retained_count = retained.len();

        let remaining = match self
            .queue
            .update(|current| reconcile(&snapshot, retained, current))
            .await
        {
            Ok(remaining) => remaining,
            Err(e) => {
                tracing::error!(error = %e, "[SYNC] Failed to persist reconciled queue");
                self.queue.count().await
            }
        };

        self.notifier.set_status(ConnectionStatus::Online);

        tracing::info!(
            total = result.total,
            succeeded = result.succeeded,
            failed = retained_count,
            remaining,
            "[SYNC] Batch processed"
        );

        if result.succeeded > 0 {
            self.notifier.events().notify(Notification::success(format!(
                "Sync complete: {}/{} operations succeeded",
                result.succeeded, result.total
            )));
        }
        let failed = result.failed.max(retained_count);
        if failed > 0 {
            self.notifier.events().notify(Notification::warning(format!(
                "{} operations could not be synced",
                failed
            )));
        }

        self.notifier.refresh_indicator(remaining);
        DrainOutcome::Completed(result)
    }
}

/// Rebuild the queue after a batch
///
/// `current` is what is stored now: normally `snapshot` followed by
/// operations enqueued during the flight.
fn reconcile(
    snapshot: &[PendingOperation],
    mut retained: Vec<PendingOperation>,
    mut current: Vec<PendingOperation>,
) -> Vec<PendingOperation> {
    let arrived = if current.starts_with(snapshot) {
        current.split_off(snapshot.len())
    } else {
        tracing::warn!("[SYNC] Queue changed unexpectedly during sync, keeping unsubmitted operations");
        current.retain(|op| !snapshot.contains(op));
        current
    };

    retained.extend(arrived);
    retained
}
