use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::AnidexError;
use crate::middleware::auth::RequireUser;
use crate::router::AnidexState;
use crate::types::community::UserRecord;

/// Profile fields the browser forwards after sign-in.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SyncProfile {
    pub name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
}

/// POST /api/users/sync -> 201 when the record was created, 200 otherwise.
pub async fn sync(
    State(state): State<AnidexState>,
    user: RequireUser,
    Json(profile): Json<SyncProfile>,
) -> Result<Response, AnidexError> {
    let record = UserRecord {
        uid: user.uid,
        name: profile.name,
        email: user.email,
        photo_url: profile.photo_url,
        role: None,
    };
    let synced = state.users.sync_user(record).await?;
    let status = if synced.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(synced)).into_response())
}
