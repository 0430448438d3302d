use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::AnidexError;
use crate::middleware::auth::RequireUser;
use crate::router::AnidexState;
use crate::service::community::NewsFeed;
use crate::types::community::{
    AnimeVote, MessageReply, TopicView, VoteDirection, VoteOutcome, VotedAnime,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub anime_id: u64,
}

#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub outcome: VoteOutcome,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityVoteRequest {
    pub anime_id: u64,
    pub title: String,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTopic {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct CastVote {
    pub direction: VoteDirection,
}

#[derive(Debug, Deserialize)]
pub struct CreateComment {
    pub content: String,
}

/// POST /api/votes {"animeId": 1}
pub async fn vote_anime(
    State(state): State<AnidexState>,
    user: RequireUser,
    Json(req): Json<VoteRequest>,
) -> Result<Json<VoteResponse>, AnidexError> {
    let outcome = state.community.vote_anime(req.anime_id, &user.email).await?;
    Ok(Json(VoteResponse { outcome }))
}

pub async fn top_voted(State(state): State<AnidexState>) -> Result<Json<Vec<VotedAnime>>, AnidexError> {
    Ok(Json(state.community.top_voted().await?))
}

/// POST /api/votes/community; the voter is always the caller.
pub async fn community_vote(
    State(state): State<AnidexState>,
    user: RequireUser,
    Json(req): Json<CommunityVoteRequest>,
) -> Result<Json<MessageReply>, AnidexError> {
    let vote = AnimeVote {
        anime_id: req.anime_id,
        title: req.title,
        image: req.image,
        user_email: user.email,
    };
    Ok(Json(state.community.community_vote(&vote).await?))
}

pub async fn topics(State(state): State<AnidexState>) -> Result<Json<Vec<TopicView>>, AnidexError> {
    Ok(Json(state.community.topics().await?))
}

pub async fn topic(
    State(state): State<AnidexState>,
    Path(id): Path<String>,
) -> Result<Json<TopicView>, AnidexError> {
    Ok(Json(state.community.topic(&id).await?))
}

pub async fn create_topic(
    State(state): State<AnidexState>,
    user: RequireUser,
    Json(req): Json<CreateTopic>,
) -> Result<Response, AnidexError> {
    let created = state.community.create_topic(&req.title, &user.email).await?;
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

pub async fn vote_topic(
    State(state): State<AnidexState>,
    user: RequireUser,
    Path(id): Path<String>,
    Json(req): Json<CastVote>,
) -> Result<Json<Value>, AnidexError> {
    Ok(Json(
        state
            .community
            .vote_topic(&id, &user.email, req.direction)
            .await?,
    ))
}

pub async fn add_comment(
    State(state): State<AnidexState>,
    user: RequireUser,
    Path(id): Path<String>,
    Json(req): Json<CreateComment>,
) -> Result<Response, AnidexError> {
    let created = state
        .community
        .add_comment(&id, &req.content, &user.email)
        .await?;
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

pub async fn vote_comment(
    State(state): State<AnidexState>,
    user: RequireUser,
    Path(id): Path<String>,
    Json(req): Json<CastVote>,
) -> Result<Json<Value>, AnidexError> {
    Ok(Json(
        state
            .community
            .vote_comment(&id, &user.email, req.direction)
            .await?,
    ))
}

pub async fn news(State(state): State<AnidexState>) -> Json<NewsFeed> {
    Json(state.community.news().await)
}
