use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::AnidexError;
use crate::db::CacheStats;
use crate::middleware::auth::RequireAdmin;
use crate::router::AnidexState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ClearQuery {
    /// Only drop keys starting with this prefix.
    pub prefix: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Cleared {
    pub removed: u64,
}

/// GET /admin/cache
pub async fn cache_stats(
    _admin: RequireAdmin,
    State(state): State<AnidexState>,
) -> Result<Json<CacheStats>, AnidexError> {
    Ok(Json(state.catalog.cache().stats().await?))
}

/// DELETE /admin/cache[?prefix=jikan-anime-]
pub async fn clear_cache(
    _admin: RequireAdmin,
    State(state): State<AnidexState>,
    Query(query): Query<ClearQuery>,
) -> Result<Json<Cleared>, AnidexError> {
    let cache = state.catalog.cache();
    let removed = match query.prefix.as_deref().filter(|p| !p.is_empty()) {
        Some(prefix) => cache.invalidate_prefix(prefix).await?,
        None => cache.clear().await?,
    };
    info!(removed, prefix = ?query.prefix, "cache cleared by admin");
    Ok(Json(Cleared { removed }))
}
