/**
 * Sync Event System
 *
 * This module defines the events the offline sync client emits for a
 * presentation layer: the connection/pending indicator, user notifications,
 * connectivity transitions and queue changes.
 *
 * # Broadcasting
 *
 * Events are broadcast using `tokio::sync::broadcast`, so any number of
 * subscribers (a status bar, a toast area, a log) receive a copy of each
 * event. Publishing with no subscriber is not an error.
 */
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::shared::operation::WriteMethod;

/// Reachability of the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Online,
    Offline,
}

/// What the connection indicator shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "pending")]
pub enum Indicator {
    /// Backend unreachable
    Offline,
    /// Backend reachable, operations waiting to sync
    Pending(usize),
    /// Backend reachable, nothing queued
    Idle,
}

impl Indicator {
    /// Derive the indicator from the connection flag and the queue length
    pub fn compute(status: ConnectionStatus, pending: usize) -> Self {
        match (status, pending) {
            (ConnectionStatus::Offline, _) => Indicator::Offline,
            (ConnectionStatus::Online, 0) => Indicator::Idle,
            (ConnectionStatus::Online, n) => Indicator::Pending(n),
        }
    }

    /// Short badge text
    pub fn label(&self) -> String {
        match self {
            Indicator::Offline => "Offline".to_string(),
            Indicator::Pending(n) => format!("{} pending", n),
            Indicator::Idle => "Online".to_string(),
        }
    }

    /// Tooltip text
    pub fn title(&self) -> String {
        match self {
            Indicator::Offline => "No connection to the server".to_string(),
            Indicator::Pending(1) => "1 operation waiting to sync. Sync now to retry.".to_string(),
            Indicator::Pending(n) => format!("{} operations waiting to sync. Sync now to retry.", n),
            Indicator::Idle => "Connected to the server".to_string(),
        }
    }
}

/// Severity of a user notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A message meant for the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self { level: NotificationLevel::Success, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: NotificationLevel::Warning, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NotificationLevel::Error, message: message.into() }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self { level: NotificationLevel::Info, message: message.into() }
    }
}

/// Event published by the sync client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum SyncEvent {
    /// The indicator was recomputed
    IndicatorChanged { indicator: Indicator },
    /// Something the user should read
    Notification(Notification),
    /// The backend became reachable or unreachable
    ConnectivityChanged { status: ConnectionStatus },
    /// A write was queued instead of sent
    OperationQueued { method: WriteMethod, path: String, pending: usize },
    /// Backend data changed under the current view (after an import)
    RefreshRequested,
}

/// Broadcast channel carrying sync events
///
/// Cloning the bus shares the channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SyncEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.sender.subscribe()
    }

    /// Publish an event, returning how many subscribers received it
    pub fn publish(&self, event: SyncEvent) -> usize {
        match self.sender.send(event) {
            Ok(subscriber_count) => subscriber_count,
            Err(_) => {
                tracing::trace!("[EVENTS] No subscribers for event");
                0
            }
        }
    }

    pub fn notify(&self, notification: Notification) -> usize {
        tracing::info!(level = ?notification.level, "[NOTIF] {}", notification.message);
        self.publish(SyncEvent::Notification(notification))
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
