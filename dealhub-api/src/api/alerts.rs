//! Price alert and notification endpoints (API key required)

use axum::{
    extract::{Path, State},
    Json,
};
use dealhub_common::cache::{self, keys, ttl};
use dealhub_common::db::{AlertType, Notification, PriceAlert, Product};
use dealhub_common::utils::{format_inr, slugify};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use super::auth::AuthUser;
use super::products::non_empty;
use super::json::ApiJson;
use crate::db::{alerts, notifications, products};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Threshold given to new `drop_percentage` alerts
pub const DEFAULT_DROP_PERCENTAGE: f64 = 10.0;
const PLACEHOLDER_CATEGORY: &str = "uncategorized";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlertRequest {
    pub product_title: Option<String>,
    pub target_price: f64,
    #[serde(default)]
    pub alert_type: Option<String>,
    /// Page the alert was created from; informational only
    #[serde(default)]
    pub source_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlertResponse {
    pub success: bool,
    pub alert_id: String,
    pub message: String,
}

/// POST /api/alerts/create
///
/// Unknown titles get a placeholder catalog entry so the alert has a product.
pub async fn create_alert(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(request): ApiJson<CreateAlertRequest>,
) -> ApiResult<Json<CreateAlertResponse>> {
    let title = non_empty(request.product_title.as_deref())
        .ok_or_else(|| ApiError::BadRequest("Product title required".to_string()))?;

    if !request.target_price.is_finite() || request.target_price <= 0.0 {
        return Err(ApiError::BadRequest("Target price must be positive".to_string()));
    }

    let alert_type = match non_empty(request.alert_type.as_deref()) {
        Some(value) => value.parse::<AlertType>()?,
        None => AlertType::Below,
    };
    let drop_percentage = match alert_type {
        AlertType::DropPercentage => Some(DEFAULT_DROP_PERCENTAGE),
        AlertType::Below => None,
    };

    let product = match products::find_product_by_title(&state.db, title).await? {
        Some(product) => product,
        None => create_placeholder_product(&state.db, title, request.target_price).await?,
    };

    let alert = alerts::create_alert(
        &state.db,
        &user.id,
        &product.id,
        request.target_price,
        alert_type,
        drop_percentage,
    )
    .await?;

    cache::invalidate(state.cache.as_ref(), &keys::user_alerts(&user.id)).await;

    info!(
        "Alert {} created for user {} on product {}{}",
        alert.id,
        user.id,
        product.id,
        request
            .source_url
            .as_deref()
            .map(|url| format!(" (from {})", url))
            .unwrap_or_default()
    );

    Ok(Json(CreateAlertResponse {
        success: true,
        alert_id: alert.id,
        message: format!("Price alert set for {}", format_inr(request.target_price)),
    }))
}

/// GET /api/alerts
pub async fn list_alerts(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<Vec<PriceAlert>>> {
    let cache_key = keys::user_alerts(&user.id);

    if let Some(cached) = cache::load_json::<Vec<PriceAlert>>(state.cache.as_ref(), &cache_key).await {
        return Ok(Json(cached));
    }

    let user_alerts = alerts::list_user_alerts(&state.db, &user.id).await?;
    cache::store_json(state.cache.as_ref(), &cache_key, &user_alerts, ttl::USER_DATA).await;

    Ok(Json(user_alerts))
}

/// DELETE /api/alerts/:id
///
/// Deactivates the alert; it stays in the user's history.
pub async fn delete_alert(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(alert_id): Path<String>,
) -> ApiResult<Json<Value>> {
    if !alerts::deactivate_alert(&state.db, &alert_id, &user.id).await? {
        return Err(ApiError::NotFound("Alert not found".to_string()));
    }

    cache::invalidate(state.cache.as_ref(), &keys::user_alerts(&user.id)).await;

    Ok(Json(json!({ "success": true })))
}

/// GET /api/notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<Vec<Notification>>> {
    let items = notifications::list_user_notifications(&state.db, &user.id).await?;
    Ok(Json(items))
}

/// Unverified catalog entry priced around the alert's target
async fn create_placeholder_product(pool: &SqlitePool, title: &str, target_price: f64) -> ApiResult<Product> {
    let base = slugify(title);
    let suffix = || Uuid::new_v4().simple().to_string()[..8].to_string();

    let slug = if base.is_empty() {
        suffix()
    } else if products::slug_exists(pool, &base).await? {
        format!("{}-{}", base, suffix())
    } else {
        base
    };

    let product = products::create_product(
        pool,
        &products::NewProduct {
            title: title.to_string(),
            slug,
            category_id: PLACEHOLDER_CATEGORY.to_string(),
            product_type: PLACEHOLDER_CATEGORY.to_string(),
            min_price: target_price,
            max_price: target_price * 1.5,
            verified: false,
        },
    )
    .await?;

    info!("Created placeholder product {} for '{}'", product.id, title);
    Ok(product)
}
