//! Database module: SQLite-backed response cache and search history.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows
//! - `schema.rs`: SQL DDL for initializing the database
//! - `sqlite.rs`: storage handles over a shared pool

pub mod models;
pub mod schema;
pub mod sqlite;

pub use models::{CacheEntry, CacheStats};
pub use schema::SQLITE_INIT;
pub use sqlite::{CacheStorage, HistoryStorage, SqlitePool, connect};
