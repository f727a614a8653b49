//! Scheduled job trigger (cron secret required)

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::services::run_price_job;
use crate::AppState;

/// GET /api/cron/update-prices
///
/// Refreshes every verified product's prices, then evaluates alerts.
pub async fn update_prices(State(state): State<AppState>) -> Response {
    let result = run_price_job(
        &state.db,
        state.cache.as_ref(),
        state.price_source.as_ref(),
        state.settings.refresh_concurrency,
    )
    .await;

    match result {
        Ok(report) => Json(report).into_response(),
        Err(e) => {
            error!("Cron job error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Failed to update prices",
                    "details": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}
