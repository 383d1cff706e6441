//! # Offline Support Module
//!
//! Storage of writes made while the backend is unreachable, and the file
//! format used to carry them to another client instance.
//!
//! ## Components
//!
//! - **queue**: durable FIFO of pending operations
//! - **transfer**: export and import of transfer documents

pub mod queue;
pub mod transfer;

pub use queue::QueueStore;
pub use transfer::{ExportOutcome, ImportOutcome, ImportPreview, ImportReport, TransferDocument, TransferService};
