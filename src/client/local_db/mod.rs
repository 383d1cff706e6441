//! # Local Storage Module
//!
//! Key-value persistence for the offline sync client. The queue of pending
//! operations lives under a single well-known key, serialized as JSON, so
//! the storage surface only needs three operations: get, set, remove.
//!
//! ## Key Components
//!
//! - `KeyValueStore`: the persistence surface the queue store writes through
//! - `SqliteStore`: durable store backed by a local SQLite file
//! - `MemoryStore`: in-process store for tests and throwaway sessions
//! - `schema.rs`: table definitions and schema versioning
//!
//! ## Usage
//!
//! ```rust,no_run
//! use gestion_sync::client::local_db::{KeyValueStore, SqliteStore};
//!
//! # async fn example() -> gestion_sync::shared::error::Result<()> {
//! let store = SqliteStore::open("/tmp/gestion/local.db").await?;
//! store.set("cola_sync", "[]").await?;
//! assert_eq!(store.get("cola_sync").await?, Some("[]".to_string()));
//! # Ok(())
//! # }
//! ```

pub mod memory;
pub mod schema;

pub use memory::MemoryStore;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::Path;

use crate::shared::error::Result;

/// Local key-value persistence surface
///
/// Implementations must make `set` atomic: a reader sees either the previous
/// value or the new one, never a partial write.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete `key` if present
    async fn remove(&self, key: &str) -> Result<()>;
}

/// SQLite-backed key-value store
///
/// Uses WAL mode; every `set` is a single upsert statement.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open or create a database file
    ///
    /// Creates the parent directory if it doesn't exist and initializes the
    /// schema.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;

        tracing::debug!(path = %path.display(), "[STORE] SQLite store opened");
        Ok(store)
    }

    /// Open a private in-memory database
    ///
    /// Limited to a single connection: every new connection to
    /// `:memory:` would otherwise see its own empty database.
    pub async fn in_memory() -> Result<Self> {
        let options: SqliteConnectOptions = "sqlite::memory:".parse()?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Create tables and apply pending migrations
    async fn init_schema(&self) -> Result<()> {
        sqlx::query(schema::CREATE_MIGRATIONS_TABLE)
            .execute(&self.pool)
            .await?;

        let current_version: (i64,) = sqlx::query_as(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        )
        .fetch_one(&self.pool)
        .await?;

        for version in schema::pending_migrations(current_version.0) {
            self.apply_migration(version).await?;
        }

        Ok(())
    }

    async fn apply_migration(&self, version: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for statement in schema::migration_statements(version) {
            sqlx::query(statement).execute(&mut *tx).await?;
        }

        sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (?, ?)")
            .bind(version)
            .bind(chrono::Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(version, "[STORE] Applied schema migration");
        Ok(())
    }

    /// Get connection pool reference
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(value,)| value))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
