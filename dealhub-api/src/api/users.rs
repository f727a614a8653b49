//! Account registration

use axum::{extract::State, http::StatusCode, Json};
use dealhub_common::rate_limit::RateLimits;
use dealhub_common::utils::validate_email;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::client::{enforce_rate_limit, ClientIp};
use super::products::non_empty;
use super::json::ApiJson;
use crate::db::users;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub user_id: String,
    pub api_key: String,
    pub affiliate_id: String,
}

/// POST /api/users/register
///
/// The API key is only ever returned here.
pub async fn register_user(
    State(state): State<AppState>,
    ip: ClientIp,
    body: ApiResult<ApiJson<RegisterRequest>>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    enforce_rate_limit(&state, &ip, "/api/users/register", RateLimits::AUTH).await?;
    let ApiJson(request) = body?;

    let email = request.email.trim().to_lowercase();
    if !validate_email(&email) {
        return Err(ApiError::BadRequest("Invalid email address".to_string()));
    }

    if users::email_exists(&state.db, &email).await? {
        return Err(ApiError::Conflict("Email already registered".to_string()));
    }

    let user = users::create_user(&state.db, &email, non_empty(request.name.as_deref())).await?;
    info!("Registered user {}", user.id);

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: user.id,
            api_key: user.api_key,
            affiliate_id: user.affiliate_id,
        }),
    ))
}
