use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::AnidexError;
use crate::router::AnidexState;
use crate::types::jikan::{Anime, BrowseFilters, JikanPage, TopFilter};

const DEFAULT_SEARCH_LIMIT: u32 = 12;
const DEFAULT_SEASON_LIMIT: u32 = 12;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct TopQuery {
    pub filter: Option<TopFilter>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<u32>,
}

/// GET /api/anime/search?q=...&limit=...
pub async fn search(
    State(state): State<AnidexState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<JikanPage<Anime>>, AnidexError> {
    let page = state
        .catalog
        .search(&query.q, query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT))
        .await?;
    Ok(Json(page))
}

pub async fn anime(State(state): State<AnidexState>, Path(id): Path<u64>) -> Result<Json<Anime>, AnidexError> {
    Ok(Json(state.catalog.anime(id).await?))
}

pub async fn anime_full(State(state): State<AnidexState>, Path(id): Path<u64>) -> Result<Json<Anime>, AnidexError> {
    Ok(Json(state.catalog.anime_full(id).await?))
}

pub async fn top(
    State(state): State<AnidexState>,
    Query(query): Query<TopQuery>,
) -> Result<Json<JikanPage<Anime>>, AnidexError> {
    let page = state
        .catalog
        .top(query.filter, query.page, query.limit)
        .await?;
    Ok(Json(page))
}

pub async fn season_now(
    State(state): State<AnidexState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<JikanPage<Anime>>, AnidexError> {
    let page = state
        .catalog
        .season_now(query.limit.unwrap_or(DEFAULT_SEASON_LIMIT))
        .await?;
    Ok(Json(page))
}

/// GET /api/anime/trending?page=&genre=&min_score=&year=&status=&type=
pub async fn trending(
    State(state): State<AnidexState>,
    Query(filters): Query<BrowseFilters>,
) -> Result<Json<JikanPage<Anime>>, AnidexError> {
    Ok(Json(state.catalog.trending(&filters).await?))
}

/// GET /api/anime/random -> one well-ranked anime with its trailer.
pub async fn random(State(state): State<AnidexState>) -> Result<Json<Anime>, AnidexError> {
    Ok(Json(state.catalog.random_pick().await?))
}
