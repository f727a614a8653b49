//! Browser extension endpoints

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use dealhub_common::cache::{self, keys, ttl};
use dealhub_common::rate_limit::RateLimits;
use dealhub_common::retailers::detect_store;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::client::{enforce_rate_limit, ClientIp};
use super::products::non_empty;
use super::json::ApiJson;
use crate::db::events;
use crate::error::ApiResult;
use crate::services::comparison;
use crate::AppState;

pub const EXTENSION_ID_HEADER: &str = "x-extension-id";
const ANONYMOUS_EXTENSION: &str = "anonymous";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectRequest {
    pub extension_id: Option<String>,
    pub user_id: Option<String>,
    pub current_url: Option<String>,
    pub product_title: Option<String>,
    pub store_name: Option<String>,
}

/// POST /api/extension/detect
///
/// Matches the product the extension scraped from a retailer page.
pub async fn detect_product(
    State(state): State<AppState>,
    ip: ClientIp,
    headers: HeaderMap,
    body: ApiResult<ApiJson<DetectRequest>>,
) -> ApiResult<Response> {
    enforce_rate_limit(&state, &ip, "/api/extension/detect", RateLimits::COMPARISON).await?;
    let ApiJson(request) = body?;

    let Some(title) = non_empty(request.product_title.as_deref()) else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Product title required", "comparison": null })),
        )
            .into_response());
    };

    let Some(found) = comparison::detect_for_extension(&state.db, title).await? else {
        return Ok(Json(json!({
            "found": false,
            "message": "Product not in database",
            "comparison": null,
        }))
        .into_response());
    };

    if let Some(user_id) = non_empty(request.user_id.as_deref()) {
        let store_name = request
            .store_name
            .clone()
            .or_else(|| {
                request
                    .current_url
                    .as_deref()
                    .and_then(detect_store)
                    .map(str::to_string)
            });

        // Best effort
        if let Err(e) = events::create_extension_event(
            &state.db,
            user_id,
            "comparison_viewed",
            request.current_url.as_deref(),
            Some(&found.product.title),
            store_name.as_deref(),
        )
        .await
        {
            warn!("Failed to log extension event: {}", e);
        }
    }

    let extension_id = non_empty(request.extension_id.as_deref())
        .or_else(|| {
            headers
                .get(EXTENSION_ID_HEADER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| non_empty(Some(value)))
        })
        .unwrap_or(ANONYMOUS_EXTENSION);

    cache::store_json(state.cache.as_ref(), &keys::extension(extension_id), &found, ttl::PRICES).await;

    Ok(Json(found).into_response())
}
