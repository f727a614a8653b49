//! Product price refresh
//!
//! Pulls fresh observations from a [`PriceSource`], stores them as price
//! records, moves the product's price range and drops stale cache entries.

use async_trait::async_trait;
use dealhub_common::cache::{self, keys, Cache};
use dealhub_common::db::{PriceRecord, Product};
use dealhub_common::{Error, Result};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use url::Url;

use crate::db::{prices, products, stores};

/// One price seen at one store
#[derive(Debug, Clone, PartialEq)]
pub struct PriceObservation {
    /// Retailer name as stored in `stores.name` (e.g. "amazon")
    pub store_name: String,
    pub price: f64,
    pub original_price: Option<f64>,
    pub discount: Option<f64>,
    pub in_stock: bool,
    pub url: String,
}

/// Where current prices come from
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_prices(&self, product: &Product) -> Result<Vec<PriceObservation>>;
}

/// Estimates an Amazon price at 5% under the product's current minimum
///
/// Stand-in until real retailer integrations exist.
#[derive(Debug, Default, Clone, Copy)]
pub struct EstimatedPriceSource;

#[async_trait]
impl PriceSource for EstimatedPriceSource {
    async fn fetch_prices(&self, product: &Product) -> Result<Vec<PriceObservation>> {
        let url = Url::parse_with_params("https://amazon.in/s", &[("k", product.title.as_str())])
            .map_err(|e| Error::Internal(format!("Could not build search URL: {}", e)))?;

        Ok(vec![PriceObservation {
            store_name: "amazon".to_string(),
            price: (product.min_price * 0.95).floor(),
            original_price: None,
            discount: Some(5.0),
            in_stock: true,
            url: url.to_string(),
        }])
    }
}

/// Outcome of a batch refresh
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    pub successful: usize,
    pub failed: usize,
    pub total: usize,
}

/// Refresh one product
///
/// Returns `None` for an unknown product, otherwise the stored records.
/// Observations for stores missing from the `stores` table are dropped.
pub async fn update_product_prices(
    pool: &SqlitePool,
    cache: &dyn Cache,
    source: &dyn PriceSource,
    product_id: &str,
) -> Result<Option<Vec<PriceRecord>>> {
    let Some(product) = products::get_product(pool, product_id).await? else {
        return Ok(None);
    };

    let observations = source.fetch_prices(&product).await?;

    let mut rows = Vec::with_capacity(observations.len());
    for obs in &observations {
        let Some(store) = stores::get_store_by_name(pool, &obs.store_name).await? else {
            debug!("Skipping price from unknown store '{}'", obs.store_name);
            continue;
        };

        rows.push(prices::NewPrice {
            product_id: product.id.clone(),
            store_id: store.id,
            price: obs.price,
            original_price: obs.original_price,
            discount: obs.discount,
            in_stock: obs.in_stock,
            url: obs.url.clone(),
        });
    }

    // Records and the new range land together or not at all
    let mut tx = pool.begin().await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in &rows {
        records.push(prices::insert_price(&mut *tx, row).await?);
    }

    // The range covers every observation, stored or not
    if let Some((min, max)) = price_range(&observations) {
        let lowest_ever = product.lowest_ever_price.unwrap_or(min).min(min);
        products::update_price_bounds(&mut *tx, &product.id, min, max, lowest_ever).await?;
    }

    tx.commit().await?;

    cache::invalidate(cache, &keys::product(&product.id)).await;
    cache::invalidate(cache, &keys::comparison(&product.id)).await;

    Ok(Some(records))
}

/// Refresh every verified product, at most `concurrency` at a time
///
/// A failing product is logged and counted; it does not abort the batch.
pub async fn update_all_prices(
    pool: &SqlitePool,
    cache: &dyn Cache,
    source: &dyn PriceSource,
    concurrency: usize,
) -> Result<RefreshSummary> {
    let ids = products::verified_product_ids(pool).await?;
    let total = ids.len();

    let outcomes: Vec<bool> = stream::iter(ids)
        .map(|id| async move {
            match update_product_prices(pool, cache, source, &id).await {
                Ok(_) => true,
                Err(e) => {
                    warn!("Price refresh failed for product {}: {}", id, e);
                    false
                }
            }
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let successful = outcomes.iter().filter(|ok| **ok).count();
    let summary = RefreshSummary {
        successful,
        failed: total - successful,
        total,
    };

    info!(
        "Price update complete: {} successful, {} failed",
        summary.successful, summary.failed
    );

    Ok(summary)
}

fn price_range(observations: &[PriceObservation]) -> Option<(f64, f64)> {
    observations.iter().map(|o| o.price).fold(None, |acc, price| match acc {
        None => Some((price, price)),
        Some((min, max)) => Some((min.min(price), max.max(price))),
    })
}
