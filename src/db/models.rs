use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct CacheEntry {
    pub key: String,
    pub payload: String,
    pub size: i64,
    pub stored_at: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CacheStats {
    pub entries: i64,
    pub total_bytes: i64,
}
