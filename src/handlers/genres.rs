use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::AnidexError;
use crate::router::AnidexState;
use crate::service::catalog::GenreDetails;
use crate::types::jikan::{Genre, GenreSort};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GenrePageQuery {
    pub page: Option<u32>,
    pub sort: GenreSort,
}

pub async fn list(State(state): State<AnidexState>) -> Result<Json<Vec<Genre>>, AnidexError> {
    Ok(Json(state.catalog.genres().await?))
}

/// GET /api/genres/{name}?page=&sort=
pub async fn details(
    State(state): State<AnidexState>,
    Path(name): Path<String>,
    Query(query): Query<GenrePageQuery>,
) -> Result<Json<GenreDetails>, AnidexError> {
    let details = state
        .catalog
        .genre_details(&name, query.page.unwrap_or(1), query.sort)
        .await?;
    Ok(Json(details))
}

/// POST /api/genres/{name}/refresh -> drop cached data for that page.
pub async fn refresh(
    State(state): State<AnidexState>,
    Path(name): Path<String>,
    Query(query): Query<GenrePageQuery>,
) -> Result<StatusCode, AnidexError> {
    state
        .catalog
        .refresh_genre(&name, query.page.unwrap_or(1), query.sort)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
