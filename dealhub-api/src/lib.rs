//! dealhub-api library - price comparison, alerts and affiliate HTTP service

use std::sync::Arc;

use axum::Router;
use dealhub_common::cache::Cache;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::services::PriceSource;

pub mod api;
pub mod db;
pub mod error;
pub mod scheduler;
pub mod services;

pub use error::{ApiError, ApiResult};

/// Runtime settings handlers need beyond the pool and cache
#[derive(Debug, Clone, Default)]
pub struct ApiSettings {
    /// Bearer token for `/api/cron/*`; `None` rejects every call
    pub cron_secret: Option<String>,
    /// Bearer token for `/api/admin/*`; `None` rejects every call
    pub admin_secret: Option<String>,
    /// Products refreshed in parallel by the price job
    pub refresh_concurrency: usize,
}

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub cache: Arc<dyn Cache>,
    pub price_source: Arc<dyn PriceSource>,
    pub settings: Arc<ApiSettings>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        cache: Arc<dyn Cache>,
        price_source: Arc<dyn PriceSource>,
        settings: ApiSettings,
    ) -> Self {
        Self {
            db,
            cache,
            price_source,
            settings: Arc::new(settings),
        }
    }
}

/// Build application router
///
/// Public and API-key routes are open to the extension from any origin.
/// Cron and admin routes sit behind their own bearer secrets.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{delete, get, post};

    let cron = Router::new()
        .route("/api/cron/update-prices", get(api::update_prices))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::require_cron_secret,
        ));

    let admin = Router::new()
        .route("/api/admin/affiliate-links", post(api::upsert_affiliate_link))
        .route(
            "/api/admin/affiliate-links/:id/commission",
            get(api::get_commission),
        )
        .route("/api/admin/payouts", post(api::create_payout))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::require_admin_secret,
        ));

    let public = Router::new()
        .route("/api/products/compare", post(api::compare_products))
        .route("/api/extension/detect", post(api::detect_product))
        .route("/api/alerts/create", post(api::create_alert))
        .route("/api/alerts", get(api::list_alerts))
        .route("/api/alerts/:id", delete(api::delete_alert))
        .route("/api/notifications", get(api::list_notifications))
        .route("/api/affiliate/track-click", post(api::track_click))
        .route("/api/affiliate/redirect/:link_id", get(api::redirect))
        .route("/api/affiliate/stats", get(api::affiliate_stats))
        .route("/api/offers/bank", get(api::bank_offers))
        .route("/api/stores", get(api::list_stores))
        .route("/api/stores/:name/offers", get(api::store_offers))
        .route("/api/users/register", post(api::register_user))
        .route("/api/buildinfo", get(api::get_build_info))
        .merge(api::health_routes());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(cron)
        .merge(admin)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
