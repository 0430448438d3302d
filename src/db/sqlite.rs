use crate::db::models::{CacheEntry, CacheStats};
use crate::db::schema::SQLITE_INIT;
use crate::error::AnidexError;
use chrono::Utc;
use serde::{Serialize, de::DeserializeOwned};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

pub type SqlitePool = Pool<Sqlite>;

/// Open (creating if needed) the database and apply the bundled schema.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, AnidexError> {
    let connect_opts = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect_with(connect_opts)
        .await?;
    init_schema(&pool).await?;
    Ok(pool)
}

async fn init_schema(pool: &SqlitePool) -> Result<(), AnidexError> {
    // sqlx::query runs one statement at a time
    for stmt in SQLITE_INIT.split(';') {
        let s = stmt.trim();
        if s.is_empty() {
            continue;
        }
        sqlx::query(s).execute(pool).await?;
    }
    Ok(())
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Cache-aside store for upstream responses.
///
/// Entries expire after a caller-supplied TTL. Before each write, if the total
/// stored size is above the soft limit, the oldest `evict_fraction` of entries
/// (rounded up) is dropped.
#[derive(Clone)]
pub struct CacheStorage {
    pool: SqlitePool,
    soft_limit_bytes: u64,
    evict_fraction: f64,
}

impl CacheStorage {
    pub fn new(pool: SqlitePool, soft_limit_bytes: u64, evict_fraction: f64) -> Self {
        Self {
            pool,
            soft_limit_bytes,
            evict_fraction: evict_fraction.clamp(0.0, 1.0),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Fetch and decode a fresh entry. Stale entries are deleted; undecodable ones read as a miss.
    pub async fn get<T>(&self, key: &str, ttl: Duration) -> Result<Option<T>, AnidexError>
    where
        T: DeserializeOwned,
    {
        let Some(entry) = self.get_raw(key).await? else {
            debug!(key, "cache miss");
            return Ok(None);
        };

        let age_ms = now_millis().saturating_sub(entry.stored_at);
        if age_ms > ttl.as_millis() as i64 {
            debug!(key, age_ms, "cache entry expired");
            self.invalidate(key).await?;
            return Ok(None);
        }

        match serde_json::from_str::<T>(&entry.payload) {
            Ok(value) => {
                debug!(key, "cache hit");
                Ok(Some(value))
            }
            Err(e) => {
                warn!(key, error = %e, "cached payload failed to decode; treating as miss");
                Ok(None)
            }
        }
    }

    pub async fn get_raw(&self, key: &str) -> Result<Option<CacheEntry>, AnidexError> {
        let row = sqlx::query_as::<_, CacheEntry>(
            "SELECT key, payload, size, stored_at FROM cache_entries WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Store a value under `key`, evicting the oldest entries first when over the soft limit.
    pub async fn put<T>(&self, key: &str, value: &T) -> Result<(), AnidexError>
    where
        T: Serialize + ?Sized,
    {
        self.put_at(key, value, now_millis()).await
    }

    pub(crate) async fn put_at<T>(
        &self,
        key: &str,
        value: &T,
        stored_at: i64,
    ) -> Result<(), AnidexError>
    where
        T: Serialize + ?Sized,
    {
        let payload = serde_json::to_string(value)?;
        let size = (key.len() + payload.len()) as i64;

        self.evict_if_over_limit().await?;

        sqlx::query(
            r#"
            INSERT INTO cache_entries (key, payload, size, stored_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                payload=excluded.payload,
                size=excluded.size,
                stored_at=excluded.stored_at
            "#,
        )
        .bind(key)
        .bind(payload)
        .bind(size)
        .bind(stored_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Returns the number of evicted entries.
    async fn evict_if_over_limit(&self) -> Result<u64, AnidexError> {
        let stats = self.stats().await?;
        if stats.total_bytes as u64 <= self.soft_limit_bytes {
            return Ok(0);
        }

        let to_remove = (stats.entries as f64 * self.evict_fraction).ceil() as i64;
        if to_remove == 0 {
            return Ok(0);
        }

        let result = sqlx::query(
            r#"
            DELETE FROM cache_entries WHERE key IN (
                SELECT key FROM cache_entries ORDER BY stored_at ASC, key ASC LIMIT ?
            )
            "#,
        )
        .bind(to_remove)
        .execute(&self.pool)
        .await?;

        info!(
            total_bytes = stats.total_bytes,
            soft_limit = self.soft_limit_bytes,
            evicted = result.rows_affected(),
            "cache over soft limit; evicted oldest entries"
        );
        Ok(result.rows_affected())
    }

    pub async fn invalidate(&self, key: &str) -> Result<(), AnidexError> {
        sqlx::query("DELETE FROM cache_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn invalidate_prefix(&self, prefix: &str) -> Result<u64, AnidexError> {
        let pattern = format!("{}%", escape_like(prefix));
        let result = sqlx::query("DELETE FROM cache_entries WHERE key LIKE ? ESCAPE '\\'")
            .bind(pattern)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn clear(&self) -> Result<u64, AnidexError> {
        let result = sqlx::query("DELETE FROM cache_entries")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn stats(&self) -> Result<CacheStats, AnidexError> {
        let stats = sqlx::query_as::<_, CacheStats>(
            "SELECT COUNT(*) AS entries, COALESCE(SUM(size), 0) AS total_bytes FROM cache_entries",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Recent recommendation queries per user, newest first.
#[derive(Clone)]
pub struct HistoryStorage {
    pool: SqlitePool,
    limit: i64,
}

impl HistoryStorage {
    pub const DEFAULT_LIMIT: i64 = 5;

    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            limit: Self::DEFAULT_LIMIT,
        }
    }

    /// Record a query. Returns `false` when it was already in the user's history.
    pub async fn record(&self, user_key: &str, query: &str) -> Result<bool, AnidexError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO search_history (user_key, query, searched_at) VALUES (?, ?, ?)
            ON CONFLICT(user_key, query) DO NOTHING
            "#,
        )
        .bind(user_key)
        .bind(query)
        .bind(now_millis())
        .execute(&mut *tx)
        .await?
        .rows_affected()
            > 0;

        if inserted {
            sqlx::query(
                r#"
                DELETE FROM search_history WHERE user_key = ? AND id NOT IN (
                    SELECT id FROM search_history WHERE user_key = ?
                    ORDER BY searched_at DESC, id DESC LIMIT ?
                )
                "#,
            )
            .bind(user_key)
            .bind(user_key)
            .bind(self.limit)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    pub async fn list(&self, user_key: &str) -> Result<Vec<String>, AnidexError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"SELECT query FROM search_history WHERE user_key = ?
               ORDER BY searched_at DESC, id DESC LIMIT ?"#,
        )
        .bind(user_key)
        .bind(self.limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(q,)| q).collect())
    }
}
