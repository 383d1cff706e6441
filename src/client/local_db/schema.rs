//! Database Schema Definitions
//!
//! Contains the SQLite schema of the local store and its migrations.

/// Current database schema version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// Bookkeeping table for applied migrations
pub const CREATE_MIGRATIONS_TABLE: &str = "CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
)";

const MIGRATION_1: &[&str] = &["CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
)"];

/// Versions newer than `current_version`, oldest first
pub fn pending_migrations(current_version: i64) -> Vec<i64> {
    (current_version + 1..=CURRENT_SCHEMA_VERSION).collect()
}

/// SQL statements of one migration
pub fn migration_statements(version: i64) -> &'static [&'static str] {
    match version {
        1 => MIGRATION_1,
        _ => &[],
    }
}
