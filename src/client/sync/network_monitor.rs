//! # Network Monitor
//!
//! Tracks whether the backend is reachable by probing a cheap endpoint.
//!
//! ## States
//!
//! `ONLINE` (initial, optimistic) and `OFFLINE`. A successful probe while
//! `OFFLINE` moves to `ONLINE` and, with operations queued, drains the
//! queue. A failed probe always moves to `OFFLINE`. Every probe ends with
//! an indicator refresh.
//!
//! Probes do not mutate anything on the backend, so overlapping probes are
//! harmless; the drain they may trigger is single-flight on its own.
//!
//! A triggered drain runs in its own task. Aborting the probe loop must not
//! cut a drain off between the batch submit and the queue reconciliation,
//! or the accepted operations would be sent again.

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::client::api::BackendClient;
use crate::client::offline::QueueStore;
use crate::client::sync::sync_state::Notifier;
use crate::client::sync::{DrainOutcome, SyncEngine};
use crate::shared::event::{ConnectionStatus, Indicator};

/// Connectivity hint from the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkSignal {
    /// The host reports the network as available
    Up,
    /// The host reports the network as gone
    Down,
}

/// What one probe observed and did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    /// Status after the probe
    pub status: ConnectionStatus,
    /// Whether the status changed
    pub transitioned: bool,
    /// Drain triggered by an OFFLINE → ONLINE transition
    pub drain: Option<DrainOutcome>,
    /// Indicator shown after the probe
    pub indicator: Indicator,
}

/// Reachability state machine
#[derive(Debug)]
pub struct ConnectivityMonitor {
    backend: BackendClient,
    queue: Arc<QueueStore>,
    engine: Arc<SyncEngine>,
    notifier: Notifier,
    /// Held by a triggered drain until it finishes
    drain_gate: Arc<Mutex<()>>,
}

impl ConnectivityMonitor {
    pub fn new(backend: BackendClient, queue: Arc<QueueStore>, engine: Arc<SyncEngine>, notifier: Notifier) -> Self {
        Self {
            backend,
            queue,
            engine,
            notifier,
            drain_gate: Arc::new(Mutex::new(())),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.notifier.state().status()
    }

    /// Probe the backend once and apply the transition
    pub async fn probe(&self) -> ProbeOutcome {
        let (status, transitioned, drain) = match self.backend.probe().await {
            Ok(()) => {
                let transitioned = self.notifier.set_status(ConnectionStatus::Online);
                let mut drain = None;
                if transitioned {
                    let pending = self.queue.count().await;
                    tracing::info!(pending, "[MONITOR] Backend reachable again");
                    if pending > 0 {
                        drain = self.drain_detached().await;
                    }
                }
                (ConnectionStatus::Online, transitioned, drain)
            }
            Err(e) => {
                let transitioned = self.notifier.set_status(ConnectionStatus::Offline);
                if transitioned {
                    tracing::warn!(error = %e, "[MONITOR] Backend unreachable");
                } else {
                    tracing::debug!(error = %e, "[MONITOR] Backend still unreachable");
                }
                (ConnectionStatus::Offline, transitioned, None)
            }
        };

        let indicator = self.notifier.refresh_indicator(self.queue.count().await);

        ProbeOutcome {
            status,
            transitioned,
            drain,
            indicator,
        }
    }

    /// Wait until a drain started by a probe has finished
    pub async fn wait_idle(&self) {
        let _gate = self.drain_gate.lock().await;
    }

    async fn drain_detached(&self) -> Option<DrainOutcome> {
        let gate = self.drain_gate.clone().lock_owned().await;
        let engine = self.engine.clone();
        let task = tokio::spawn(async move {
            let _gate = gate;
            engine.drain().await
        });

        match task.await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::error!(error = %e, "[MONITOR] Drain task failed");
                None
            }
        }
    }

    /// React to an environment signal with an immediate probe
    ///
    /// `Down` is not trusted on its own: the probe decides.
    pub async fn handle_signal(&self, signal: NetworkSignal) -> ProbeOutcome {
        tracing::debug!(?signal, "[MONITOR] Network signal received");
        self.probe().await
    }
}
