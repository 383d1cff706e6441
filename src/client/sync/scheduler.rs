//! # Probe Scheduler
//!
//! Background loop that drives the connectivity monitor: a first probe
//! after a short startup delay, then one per interval, plus an immediate
//! probe for every network signal.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::client::sync::network_monitor::{ConnectivityMonitor, NetworkSignal};

const SIGNAL_BUFFER: usize = 16;

/// Timing of the probe loop
#[derive(Debug, Clone, Copy)]
pub struct ProbeSchedule {
    pub initial_delay: Duration,
    pub interval: Duration,
}

/// Handle to the running probe loop
///
/// The loop stops when the handle is dropped. A drain it already started
/// runs to completion in the background; `shutdown` waits for it.
#[derive(Debug)]
pub struct MonitorHandle {
    task: JoinHandle<()>,
    signals: mpsc::Sender<NetworkSignal>,
    monitor: Arc<ConnectivityMonitor>,
}

impl MonitorHandle {
    /// Forward an environment signal to the loop
    ///
    /// Returns `false` when the loop is gone or its buffer is full; a
    /// dropped signal is harmless since the next tick probes anyway.
    pub fn signal(&self, signal: NetworkSignal) -> bool {
        match self.signals.try_send(signal) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = %e, "[MONITOR] Network signal dropped");
                false
            }
        }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    pub fn stop(self) {
        drop(self);
    }

    /// Stop the loop and wait for an in-flight drain to reconcile the queue
    pub async fn shutdown(self) {
        self.task.abort();
        self.monitor.wait_idle().await;
        tracing::info!("[MONITOR] Probe loop stopped");
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Start the probe loop on the current runtime
pub fn spawn(monitor: Arc<ConnectivityMonitor>, schedule: ProbeSchedule) -> MonitorHandle {
    let (sender, receiver) = mpsc::channel(SIGNAL_BUFFER);
    let task = tokio::spawn(probe_loop(monitor.clone(), schedule, receiver));

    tracing::info!(
        initial_delay_ms = schedule.initial_delay.as_millis() as u64,
        interval_secs = schedule.interval.as_secs(),
        "[MONITOR] Probe loop started"
    );

    MonitorHandle {
        task,
        signals: sender,
        monitor,
    }
}

async fn probe_loop(
    monitor: Arc<ConnectivityMonitor>,
    schedule: ProbeSchedule,
    mut signals: mpsc::Receiver<NetworkSignal>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + schedule.initial_delay, schedule.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                monitor.probe().await;
            }
            Some(signal) = signals.recv() => {
                monitor.handle_signal(signal).await;
            }
        }
    }
}
