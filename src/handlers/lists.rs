use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::AnidexError;
use crate::api::backend_api::ListKind;
use crate::middleware::auth::RequireUser;
use crate::router::AnidexState;
use crate::types::community::ListEntry;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToWishlist {
    pub anime_id: u64,
}

pub async fn wishlist(
    State(state): State<AnidexState>,
    user: RequireUser,
) -> Result<Json<Vec<ListEntry>>, AnidexError> {
    Ok(Json(state.lists.list(ListKind::Wishlist, &user.email).await?))
}

pub async fn watchlist(
    State(state): State<AnidexState>,
    user: RequireUser,
) -> Result<Json<Vec<ListEntry>>, AnidexError> {
    Ok(Json(state.lists.list(ListKind::Watchlist, &user.email).await?))
}

/// POST /api/wishlist {"animeId": 1} -> 201 when stored, 200 when already listed.
pub async fn add_to_wishlist(
    State(state): State<AnidexState>,
    user: RequireUser,
    Json(req): Json<AddToWishlist>,
) -> Result<Response, AnidexError> {
    let outcome = state.lists.add_to_wishlist(req.anime_id, &user.email).await?;
    let status = if outcome.added {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome)).into_response())
}

pub async fn remove_from_wishlist(
    State(state): State<AnidexState>,
    _user: RequireUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AnidexError> {
    state.lists.remove(ListKind::Wishlist, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_from_watchlist(
    State(state): State<AnidexState>,
    _user: RequireUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AnidexError> {
    state.lists.remove(ListKind::Watchlist, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/wishlist/{id}/watched
pub async fn mark_watched(
    State(state): State<AnidexState>,
    user: RequireUser,
    Path(id): Path<String>,
) -> Result<Json<ListEntry>, AnidexError> {
    Ok(Json(state.lists.mark_watched(&id, &user.email).await?))
}
