//! Shared Module
//!
//! Types that every part of the sync client agrees on: the queued write
//! intents and the batch wire format, the events published to the
//! presentation layer, the error taxonomy, and the configuration.
//!
//! # Overview
//!
//! Nothing in this module performs I/O. All types are designed for
//! serialization, either to the backend, to local storage, or to a transfer
//! file.

/// Pending operations and batch-sync wire types
pub mod operation;

/// Events published to the presentation layer
pub mod event;

/// Error types
pub mod error;

/// Client configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use operation::{BatchItemResult, BatchResponse, Method, PendingOperation, SyncResult, WriteMethod};
pub use event::{ConnectionStatus, EventBus, Indicator, Notification, NotificationLevel, SyncEvent};
pub use error::SyncError;
pub use config::{ConfigError, SyncConfig, SyncConfigBuilder};
