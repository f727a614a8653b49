//! Operator endpoints (admin secret required)

use axum::{
    extract::{Path, State},
    Json,
};
use dealhub_common::db::AffiliateLink;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::json::ApiJson;
use crate::error::ApiResult;
use crate::services::affiliate::{self, NewAffiliateLink, PayoutReceipt};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutRequest {
    pub user_id: String,
    pub amount: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionResponse {
    pub affiliate_link_id: String,
    pub commission: f64,
}

/// POST /api/admin/affiliate-links
pub async fn upsert_affiliate_link(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<NewAffiliateLink>,
) -> ApiResult<Json<AffiliateLink>> {
    let link = affiliate::create_affiliate_link(&state.db, &request).await?;
    Ok(Json(link))
}

/// GET /api/admin/affiliate-links/:id/commission
pub async fn get_commission(
    State(state): State<AppState>,
    Path(link_id): Path<String>,
) -> ApiResult<Json<CommissionResponse>> {
    let commission = affiliate::calculate_commission(&state.db, &link_id).await?;
    Ok(Json(CommissionResponse {
        affiliate_link_id: link_id,
        commission,
    }))
}

/// POST /api/admin/payouts
pub async fn create_payout(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<PayoutRequest>,
) -> ApiResult<Json<Value>> {
    let receipt: PayoutReceipt = affiliate::payout(&state.db, &request.user_id, request.amount).await?;
    Ok(Json(json!({ "success": true, "payout": receipt })))
}
