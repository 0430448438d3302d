//! SQL DDL for the gateway's local state.

/// SQLite schema with:
/// - `cache_entries`: one row per cached upstream response, `size` counts key + payload bytes
/// - `search_history`: recent recommendation queries per user
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS cache_entries (
    key TEXT PRIMARY KEY,
    payload TEXT NOT NULL, -- JSON
    size INTEGER NOT NULL,
    stored_at INTEGER NOT NULL -- unix millis
);

CREATE INDEX IF NOT EXISTS idx_cache_entries_stored_at ON cache_entries(stored_at);

CREATE TABLE IF NOT EXISTS search_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_key TEXT NOT NULL,
    query TEXT NOT NULL,
    searched_at INTEGER NOT NULL,
    UNIQUE(user_key, query)
);

CREATE INDEX IF NOT EXISTS idx_search_history_user ON search_history(user_key, searched_at);
"#;
