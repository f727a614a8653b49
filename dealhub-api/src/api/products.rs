//! Product price comparison endpoint

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dealhub_common::rate_limit::RateLimits;
use serde::Deserialize;
use serde_json::json;

use super::client::{enforce_rate_limit, ClientIp};
use super::json::ApiJson;
use crate::error::{ApiError, ApiResult};
use crate::services::comparison;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareRequest {
    pub product_id: Option<String>,
    pub product_title: Option<String>,
}

/// POST /api/products/compare
///
/// Looks the product up by id (cached) or by title substring.
pub async fn compare_products(
    State(state): State<AppState>,
    ip: ClientIp,
    body: ApiResult<ApiJson<CompareRequest>>,
) -> ApiResult<Response> {
    enforce_rate_limit(&state, &ip, "/api/products/compare", RateLimits::COMPARISON).await?;
    let ApiJson(request) = body?;

    let product_id = non_empty(request.product_id.as_deref());
    let product_title = non_empty(request.product_title.as_deref());

    let comparison = match (product_id, product_title) {
        (Some(id), _) => comparison::compare_by_id(&state.db, state.cache.as_ref(), id).await?,
        (None, Some(title)) => comparison::compare_by_title(&state.db, title).await?,
        (None, None) => {
            return Err(ApiError::BadRequest("Product ID or title required".to_string()));
        }
    };

    match comparison {
        Some(comparison) => Ok(Json(comparison).into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Product not found", "similar": [] })),
        )
            .into_response()),
    }
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
