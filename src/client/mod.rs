//! Offline Sync Client Module
//!
//! Everything that talks to the backend or to local storage.
//!
//! # Architecture
//!
//! - **`api`** - HTTP transport to the backend
//! - **`gateway`** - request wrapper that queues writes on transport failure
//! - **`local_db`** - key-value persistence (SQLite or in-memory)
//! - **`offline`** - durable queue and transfer files
//! - **`sync`** - drain engine, connectivity monitor, probe loop
//!
//! # Module Structure
//!
//! ```text
//! client/
//! ├── mod.rs          - OfflineClient facade
//! ├── api.rs          - BackendClient
//! ├── gateway.rs      - RequestGateway
//! ├── local_db/       - KeyValueStore, SqliteStore, MemoryStore
//! ├── offline/        - QueueStore, TransferService
//! └── sync/           - SyncEngine, ConnectivityMonitor, scheduler
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use gestion_sync::client::OfflineClient;
//! use gestion_sync::shared::config::SyncConfig;
//!
//! # async fn example() -> gestion_sync::shared::error::Result<()> {
//! let client = OfflineClient::open(SyncConfig::from_env()?).await?;
//! let _monitor = client.spawn_monitor();
//!
//! let reply = client.gateway().post("/clientes/", serde_json::json!({"nombre": "Ana"})).await;
//! if reply.is_offline() {
//!     println!("{}", reply.message().unwrap_or_default());
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod gateway;
pub mod local_db;
pub mod offline;
pub mod sync;

pub use api::BackendClient;
pub use gateway::{GatewayResponse, RequestGateway};
pub use local_db::{KeyValueStore, MemoryStore, SqliteStore};
pub use offline::{QueueStore, TransferService};
pub use sync::{ConnectivityMonitor, ConnectivityState, DrainOutcome, MonitorHandle, SyncEngine};

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::client::sync::scheduler::{self, ProbeSchedule};
use crate::shared::config::SyncConfig;
use crate::shared::error::Result;
use crate::shared::event::{EventBus, Indicator, SyncEvent};

/// All sync components wired to one backend and one store
#[derive(Debug)]
pub struct OfflineClient {
    config: SyncConfig,
    events: EventBus,
    state: Arc<ConnectivityState>,
    queue: Arc<QueueStore>,
    gateway: RequestGateway,
    engine: Arc<SyncEngine>,
    monitor: Arc<ConnectivityMonitor>,
    transfer: TransferService,
}

impl OfflineClient {
    /// Wire the client over an existing store
    pub fn new(config: SyncConfig, store: Arc<dyn KeyValueStore>) -> Result<Self> {
        config.validate()?;

        let events = EventBus::new(config.event_capacity);
        let state = Arc::new(ConnectivityState::new());
        let notifier = sync::Notifier::new(events.clone(), state.clone());
        let backend = BackendClient::new(&config)?;

        let queue = Arc::new(
            QueueStore::new(store, config.storage_key.clone(), config.api_prefix.clone())
                .with_notifier(notifier.clone()),
        );
        let gateway = RequestGateway::new(backend.clone(), queue.clone());
        let engine = Arc::new(SyncEngine::new(backend.clone(), queue.clone(), notifier.clone()));
        let monitor = Arc::new(ConnectivityMonitor::new(
            backend.clone(),
            queue.clone(),
            engine.clone(),
            notifier,
        ));
        let transfer = TransferService::new(backend, queue.clone(), events.clone(), config.data_dir.clone());

        tracing::info!(
            api = %config.api_base_url,
            key = %config.storage_key,
            "[SYNC] Offline client ready"
        );

        Ok(Self {
            config,
            events,
            state,
            queue,
            gateway,
            engine,
            monitor,
            transfer,
        })
    }

    /// Wire the client over the SQLite file in the data directory
    pub async fn open(config: SyncConfig) -> Result<Self> {
        let store = SqliteStore::open(config.database_path()).await?;
        Self::new(config, Arc::new(store))
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn gateway(&self) -> &RequestGateway {
        &self.gateway
    }

    pub fn queue(&self) -> &Arc<QueueStore> {
        &self.queue
    }

    pub fn engine(&self) -> &Arc<SyncEngine> {
        &self.engine
    }

    pub fn monitor(&self) -> &Arc<ConnectivityMonitor> {
        &self.monitor
    }

    pub fn transfer(&self) -> &TransferService {
        &self.transfer
    }

    pub fn state(&self) -> &Arc<ConnectivityState> {
        &self.state
    }

    /// Register an observer for indicator, notification and queue events
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    pub async fn pending_count(&self) -> usize {
        self.queue.count().await
    }

    /// Indicator for the current state, without publishing it
    pub async fn indicator(&self) -> Indicator {
        Indicator::compute(self.state.status(), self.pending_count().await)
    }

    /// Manual "sync now"
    pub async fn sync_now(&self) -> DrainOutcome {
        self.engine.drain().await
    }

    /// Start the background probe loop
    pub fn spawn_monitor(&self) -> MonitorHandle {
        scheduler::spawn(
            self.monitor.clone(),
            ProbeSchedule {
                initial_delay: self.config.initial_probe_delay,
                interval: self.config.check_interval,
            },
        )
    }
}
