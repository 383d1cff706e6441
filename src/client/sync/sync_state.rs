//! # Sync State Management
//!
//! Process-wide connectivity state of the offline client. It is kept in
//! memory only and never persisted.
//!
//! ## Features
//!
//! - **Reachability Flag**: starts optimistic (online), corrected by the first probe
//! - **Single-Flight Guard**: at most one drain runs at a time
//! - **Indicator Refresh**: recompute and publish the connection indicator

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::shared::event::{ConnectionStatus, EventBus, Indicator, SyncEvent};

/// Reachability flag plus the drain guard
#[derive(Debug)]
pub struct ConnectivityState {
    online: AtomicBool,
    syncing: AtomicBool,
}

impl Default for ConnectivityState {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectivityState {
    pub fn new() -> Self {
        Self {
            online: AtomicBool::new(true),
            syncing: AtomicBool::new(false),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        if self.online.load(Ordering::SeqCst) {
            ConnectionStatus::Online
        } else {
            ConnectionStatus::Offline
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Set the reachability flag, returning the previous status
    pub fn set_status(&self, status: ConnectionStatus) -> ConnectionStatus {
        let previous = self
            .online
            .swap(status == ConnectionStatus::Online, Ordering::SeqCst);
        if previous {
            ConnectionStatus::Online
        } else {
            ConnectionStatus::Offline
        }
    }

    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::SeqCst)
    }

    /// Take the drain guard
    ///
    /// Returns `None` while another drain holds it. The guard is released
    /// when the returned value is dropped, including on early return.
    pub fn try_begin_sync(&self) -> Option<SyncGuard<'_>> {
        self.syncing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| SyncGuard { flag: &self.syncing })
    }
}

/// Holds the single-flight drain guard
#[derive(Debug)]
pub struct SyncGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Publishes indicator and connectivity changes
///
/// Shared by the queue store, the sync engine and the monitor so each
/// state-affecting event ends with the same indicator refresh.
#[derive(Debug, Clone)]
pub struct Notifier {
    events: EventBus,
    state: Arc<ConnectivityState>,
}

impl Notifier {
    pub fn new(events: EventBus, state: Arc<ConnectivityState>) -> Self {
        Self { events, state }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn state(&self) -> &Arc<ConnectivityState> {
        &self.state
    }

    /// Recompute the indicator for `pending` queued operations and publish it
    pub fn refresh_indicator(&self, pending: usize) -> Indicator {
        let indicator = Indicator::compute(self.state.status(), pending);
        tracing::debug!(pending, label = %indicator.label(), "[SYNC] Indicator refreshed");
        self.events.publish(SyncEvent::IndicatorChanged { indicator });
        indicator
    }

    /// Update the reachability flag, publishing on transition
    ///
    /// Returns `true` when the status actually changed.
    pub fn set_status(&self, status: ConnectionStatus) -> bool {
        let previous = self.state.set_status(status);
        let changed = previous != status;
        if changed {
            tracing::info!(?previous, current = ?status, "[SYNC] Connectivity changed");
            self.events.publish(SyncEvent::ConnectivityChanged { status });
        }
        changed
    }
}
