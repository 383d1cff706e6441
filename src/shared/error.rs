//! Error Types
//!
//! This module defines the error taxonomy of the offline sync client.
//! Each variant maps to one way a write intent can fail to reach the backend,
//! and each one is handled at a different boundary.
//!
//! # Error Categories
//!
//! - `Transport` - backend unreachable (DNS, connection refused, timeout).
//!   Absorbed by the gateway (writes get queued) and by the monitor (state
//!   goes offline). Never shown raw to the end user.
//! - `Application` - backend reachable but answered `ok: false`. Surfaced
//!   as-is, never queued: retrying would resubmit rejected input.
//! - `Persistence` - local storage unavailable or corrupt. Logged and treated
//!   as an empty queue.
//! - `MalformedTransfer` - an import file that is not a transfer document.
//!   Surfaced to the user with zero side effects.
//! - `PartialBatch` - some operations of a batch were rejected.
//!
//! # Usage
//!
//! ```rust
//! use gestion_sync::shared::error::SyncError;
//!
//! let error = SyncError::transport("connection refused");
//! assert!(error.is_transport());
//! assert!(!error.user_message().contains("refused"));
//! ```
use thiserror::Error;

use crate::shared::config::ConfigError;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors produced by the offline sync client
#[derive(Debug, Error)]
pub enum SyncError {
    /// The backend could not be reached at all
    #[error("Transport error: {message}")]
    Transport {
        /// Raw transport detail, for logs only
        message: String,
    },

    /// The backend answered but rejected the request
    #[error("Application error: {message}")]
    Application {
        /// Message reported by the backend
        message: String,
    },

    /// Local storage could not be read or written
    #[error("Persistence error: {message}")]
    Persistence {
        /// Human-readable error message
        message: String,
    },

    /// An import file is not a valid transfer document
    #[error("Malformed transfer file: {reason}")]
    MalformedTransfer {
        /// What is wrong with the file
        reason: String,
    },

    /// A batch was only partially accepted
    #[error("{failed} of {total} operations could not be synced")]
    PartialBatch {
        /// Operations rejected by the backend
        failed: usize,
        /// Operations submitted
        total: usize,
    },

    /// Local JSON encode/decode failure
    #[error("Serialization error: {message}")]
    Serialization {
        /// Human-readable error message
        message: String,
    },

    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SyncError {
    /// Create a new transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a new application error
    pub fn application(message: impl Into<String>) -> Self {
        Self::Application {
            message: message.into(),
        }
    }

    /// Create a new persistence error
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    /// Create a new malformed transfer error
    pub fn malformed_transfer(reason: impl Into<String>) -> Self {
        Self::MalformedTransfer {
            reason: reason.into(),
        }
    }

    /// Create a new serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Short, actionable text for the end user
    ///
    /// Transport and persistence details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport { .. } => {
                "Could not reach the server. Is the backend running?".to_string()
            }
            Self::Application { message } => message.clone(),
            Self::Persistence { .. } => {
                "Local storage is unavailable. Pending changes may not be saved.".to_string()
            }
            Self::MalformedTransfer { reason } => format!("Invalid file: {}", reason),
            Self::PartialBatch { failed, total } => {
                format!("{} of {} operations could not be synced", failed, total)
            }
            Self::Serialization { .. } => "The data could not be encoded.".to_string(),
            Self::Config(err) => format!("Invalid configuration: {}", err),
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        Self::transport(err.to_string())
    }
}

impl From<sqlx::Error> for SyncError {
    fn from(err: sqlx::Error) -> Self {
        Self::persistence(format!("SQLite error: {}", err))
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        Self::persistence(format!("I/O error: {}", err))
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(format!("JSON error: {}", err))
    }
}
