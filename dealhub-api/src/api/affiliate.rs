//! Affiliate click tracking and redirects

use axum::{
    extract::{Path, Query, State},
    http::{header::LOCATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use dealhub_common::affiliate::{generate_affiliate_link, generate_tracking_hash};
use dealhub_common::rate_limit::RateLimits;
use serde::{Deserialize, Serialize};

use super::auth::AuthUser;
use super::client::{enforce_rate_limit, user_agent, ClientIp};
use super::products::non_empty;
use super::json::ApiJson;
use crate::db::affiliate as link_db;
use crate::error::{ApiError, ApiResult};
use crate::services::affiliate::{self, AffiliateStats, ClickContext, ANONYMOUS_USER};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackClickRequest {
    pub affiliate_link_id: String,
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackClickResponse {
    pub success: bool,
    pub click_id: String,
    pub tracking_hash: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectQuery {
    pub user_id: Option<String>,
}

/// POST /api/affiliate/track-click
pub async fn track_click(
    State(state): State<AppState>,
    ip: ClientIp,
    headers: HeaderMap,
    body: ApiResult<ApiJson<TrackClickRequest>>,
) -> ApiResult<Json<TrackClickResponse>> {
    enforce_rate_limit(&state, &ip, "/api/affiliate/track-click", RateLimits::AFFILIATE_CLICK).await?;
    let ApiJson(request) = body?;

    let context = ClickContext {
        user_id: non_empty(request.user_id.as_deref()).map(str::to_string),
        ip_address: Some(ip.0.clone()),
        user_agent: user_agent(&headers),
    };

    let click = affiliate::track_affiliate_click(&state.db, &request.affiliate_link_id, &context).await?;

    let tracking_hash = generate_tracking_hash(
        &click.affiliate_link_id,
        context.user_id.as_deref().unwrap_or(ANONYMOUS_USER),
        Utc::now().timestamp_millis(),
    );

    Ok(Json(TrackClickResponse {
        success: true,
        click_id: click.id,
        tracking_hash,
    }))
}

/// GET /api/affiliate/redirect/:link_id
///
/// Records the click, then sends the browser to the tagged retailer URL.
pub async fn redirect(
    State(state): State<AppState>,
    ip: ClientIp,
    headers: HeaderMap,
    Path(link_id): Path<String>,
    Query(query): Query<RedirectQuery>,
) -> ApiResult<Response> {
    enforce_rate_limit(&state, &ip, "/api/affiliate/redirect", RateLimits::AFFILIATE_CLICK).await?;

    let link = link_db::get_link(&state.db, &link_id)
        .await?
        .filter(|link| link.active)
        .ok_or_else(|| ApiError::NotFound("Affiliate link not found".to_string()))?;

    let context = ClickContext {
        user_id: non_empty(query.user_id.as_deref()).map(str::to_string),
        ip_address: Some(ip.0),
        user_agent: user_agent(&headers),
    };
    affiliate::track_affiliate_click(&state.db, &link.id, &context).await?;

    let target = generate_affiliate_link(&link.affiliate_url, &link.affiliate_tag);
    Ok((StatusCode::FOUND, [(LOCATION, target)]).into_response())
}

/// GET /api/affiliate/stats
pub async fn affiliate_stats(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<AffiliateStats>> {
    affiliate::user_affiliate_stats(&state.db, &user.id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}
