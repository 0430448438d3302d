use axum::extract::{FromRef, FromRequestParts};
use axum::http::{HeaderMap, request::Parts};
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::error::AnidexError;

pub const ADMIN_KEY_HEADER: &str = "x-admin-key";
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_ID_HEADER: &str = "x-user-id";

/// Admin key the `/admin` routes are checked against.
#[derive(Debug, Clone)]
pub struct AdminKey(pub Arc<str>);

/// Accepts either:
/// - Header: `x-admin-key: ...`
/// - Header: `Authorization: Bearer ...`
///
/// An empty configured key rejects every request.
pub fn ensure_admin(headers: &HeaderMap, expected: &str) -> Result<(), AnidexError> {
    if expected.is_empty() {
        return Err(AnidexError::Unauthorized);
    }
    let matches = |candidate: &str| bool::from(candidate.as_bytes().ct_eq(expected.as_bytes()));

    if let Some(hv) = headers.get(ADMIN_KEY_HEADER).and_then(|v| v.to_str().ok())
        && matches(hv.trim())
    {
        return Ok(());
    }

    if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        let auth = auth.trim();
        if let Some(token) = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            && matches(token.trim())
        {
            return Ok(());
        }
    }

    Err(AnidexError::Unauthorized)
}

#[derive(Debug, Clone, Copy)]
pub struct RequireAdmin;

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
    AdminKey: FromRef<S>,
{
    type Rejection = AnidexError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AdminKey(expected) = AdminKey::from_ref(state);
        ensure_admin(&parts.headers, &expected)?;
        Ok(Self)
    }
}

/// The signed-in user, as forwarded by the browser session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequireUser {
    pub email: String,
    /// Identity-provider uid; falls back to the email when absent.
    pub uid: String,
}

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = AnidexError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let email = header(USER_EMAIL_HEADER).ok_or(AnidexError::LoginRequired)?;
        let uid = header(USER_ID_HEADER).unwrap_or_else(|| email.clone());
        Ok(Self { email, uid })
    }
}

/// Like [`RequireUser`] but never rejects; anonymous callers get `None`.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<RequireUser>);

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(RequireUser::from_request_parts(parts, state).await.ok()))
    }
}
