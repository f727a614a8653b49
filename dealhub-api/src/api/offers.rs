//! Store directory and offer listings (offers are read-through cached)

use axum::{
    extract::{Path, State},
    Json,
};
use dealhub_common::cache::{self, keys, ttl};
use dealhub_common::db::{BankOffer, Offer, Store};
use dealhub_common::time::now_timestamp;

use crate::db::{offers, stores};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// GET /api/stores
pub async fn list_stores(State(state): State<AppState>) -> ApiResult<Json<Vec<Store>>> {
    let items = stores::list_stores(&state.db).await?;
    Ok(Json(items))
}

/// GET /api/offers/bank
pub async fn bank_offers(State(state): State<AppState>) -> ApiResult<Json<Vec<BankOffer>>> {
    let cache_key = keys::bank_offers();

    if let Some(cached) = cache::load_json::<Vec<BankOffer>>(state.cache.as_ref(), &cache_key).await {
        return Ok(Json(cached));
    }

    let items = offers::active_bank_offers(&state.db, &now_timestamp(), None).await?;
    cache::store_json(state.cache.as_ref(), &cache_key, &items, ttl::BANK_OFFERS).await;

    Ok(Json(items))
}

/// GET /api/stores/:name/offers
pub async fn store_offers(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Vec<Offer>>> {
    let store = stores::get_store_by_name(&state.db, &name.to_lowercase())
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Store not found: {}", name)))?;

    let cache_key = keys::offers(&store.id);

    if let Some(cached) = cache::load_json::<Vec<Offer>>(state.cache.as_ref(), &cache_key).await {
        return Ok(Json(cached));
    }

    let items = offers::active_offers_for_store(&state.db, &store.id, &now_timestamp()).await?;
    cache::store_json(state.cache.as_ref(), &cache_key, &items, ttl::OFFERS).await;

    Ok(Json(items))
}
