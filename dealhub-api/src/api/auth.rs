//! Authentication for dealhub-api
//!
//! Users authenticate with `Authorization: Bearer <api key>`. Cron and admin
//! routes each compare the bearer token with a configured secret.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use dealhub_common::db::User;
use tracing::warn;

use crate::db::users;
use crate::error::ApiError;
use crate::AppState;

/// The user owning the request's API key
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let api_key = bearer_token(&parts.headers).ok_or(ApiError::Unauthorized)?;

        users::get_user_by_api_key(&state.db, api_key)
            .await?
            .map(AuthUser)
            .ok_or(ApiError::Unauthorized)
    }
}

/// Token from an `Authorization: Bearer ...` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Guard for `/api/cron/*`
pub async fn require_cron_secret(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    check_secret(state.settings.cron_secret.as_deref(), request.headers(), "cron")?;
    Ok(next.run(request).await)
}

/// Guard for `/api/admin/*`
pub async fn require_admin_secret(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    check_secret(state.settings.admin_secret.as_deref(), request.headers(), "admin")?;
    Ok(next.run(request).await)
}

fn check_secret(expected: Option<&str>, headers: &HeaderMap, scope: &str) -> Result<(), ApiError> {
    let Some(expected) = expected else {
        warn!("Rejected {} request: no {} secret configured", scope, scope);
        return Err(ApiError::Unauthorized);
    };

    match bearer_token(headers) {
        Some(token) if token == expected => Ok(()),
        _ => {
            warn!("Rejected {} request: bad or missing bearer token", scope);
            Err(ApiError::Unauthorized)
        }
    }
}
