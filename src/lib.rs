//! Gestion Sync - Offline Write Queue Library
//!
//! Client-side offline support for a small-business management backend
//! (clients, offers, work orders, invoices). Users keep creating, editing
//! and deleting records while the backend is unreachable; those writes are
//! kept locally and replayed later.
//!
//! # Overview
//!
//! - Request gateway that queues writes on transport failure
//! - Durable FIFO of pending operations in a local SQLite store
//! - Connectivity probing with automatic drain when the backend returns
//! - Batched replay with per-operation reconciliation
//! - Export/import of the queue between two independent instances
//!
//! # Module Structure
//!
//! - **`shared`** - Types without I/O
//!   - Pending operations and the batch wire format
//!   - Events for a presentation layer
//!   - Error types and configuration
//!
//! - **`client`** - Everything that touches the network or the disk
//!   - Backend HTTP client and request gateway
//!   - Queue store, transfer files, local database
//!   - Sync engine, connectivity monitor, probe loop
//!
//! # Feature Flags
//!
//! - **`cli`** - builds the `gestion-sync` operator binary
//!
//! # Usage
//!
//! ```rust,no_run
//! use gestion_sync::client::OfflineClient;
//! use gestion_sync::shared::config::SyncConfig;
//!
//! # async fn example() -> gestion_sync::shared::error::Result<()> {
//! let config = SyncConfig::builder()
//!     .api_base_url("http://127.0.0.1:8000/api")
//!     .build()?;
//! let client = OfflineClient::open(config).await?;
//!
//! let mut events = client.subscribe();
//! let _monitor = client.spawn_monitor();
//!
//! while let Ok(event) = events.recv().await {
//!     println!("{:?}", event);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Transport and persistence failures are absorbed where they happen and
//! turned into queue entries or connectivity changes. Rejections from the
//! backend and malformed transfer files reach the caller as
//! `shared::error::SyncError`.

/// Shared types and data structures
pub mod shared;

/// Backend access, persistence and synchronization
pub mod client;
