//! Price refresh followed by alert evaluation
//!
//! Run by `GET /api/cron/update-prices` and by the in-process scheduler.

use dealhub_common::cache::Cache;
use dealhub_common::time::now_timestamp;
use dealhub_common::Result;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

use super::alerts::{trigger_price_alerts, AlertSummary};
use super::price_refresh::{update_all_prices, PriceSource, RefreshSummary};

#[derive(Debug, Clone, Serialize)]
pub struct PriceJobReport {
    pub success: bool,
    pub timestamp: String,
    pub prices: RefreshSummary,
    pub alerts: AlertSummary,
}

pub async fn run_price_job(
    pool: &SqlitePool,
    cache: &dyn Cache,
    source: &dyn PriceSource,
    concurrency: usize,
) -> Result<PriceJobReport> {
    info!("Starting price update job");

    let prices = update_all_prices(pool, cache, source, concurrency).await?;
    let alerts = trigger_price_alerts(pool, cache).await?;

    Ok(PriceJobReport {
        success: true,
        timestamp: now_timestamp(),
        prices,
        alerts,
    })
}
