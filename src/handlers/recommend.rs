use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};

use crate::AnidexError;
use crate::middleware::auth::{MaybeUser, RequireUser};
use crate::router::AnidexState;
use crate::service::recommend::Recommendation;
use crate::service::title_extractor;

#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    pub query: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SuggestQuery {
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct QueryList {
    pub queries: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct LuckyQuery {
    pub query: &'static str,
}

/// POST /api/recommend {"query": "..."}
pub async fn recommend(
    State(state): State<AnidexState>,
    MaybeUser(user): MaybeUser,
    Json(req): Json<RecommendRequest>,
) -> Result<Json<Recommendation>, AnidexError> {
    let user_key = user.as_ref().map(|u| u.email.as_str());
    Ok(Json(state.recommend.recommend(&req.query, user_key).await?))
}

pub async fn suggestions(Query(query): Query<SuggestQuery>) -> Json<QueryList> {
    let queries = title_extractor::suggestions(&query.q)
        .into_iter()
        .map(str::to_string)
        .collect();
    Json(QueryList { queries })
}

pub async fn lucky() -> Json<LuckyQuery> {
    Json(LuckyQuery {
        query: title_extractor::random_query(),
    })
}

/// GET /api/recommend/history -> the caller's recent queries, newest first.
pub async fn history(
    State(state): State<AnidexState>,
    user: RequireUser,
) -> Result<Json<QueryList>, AnidexError> {
    let queries = state.recommend.history(&user.email).await?;
    Ok(Json(QueryList { queries }))
}
