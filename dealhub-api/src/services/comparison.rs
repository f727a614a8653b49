//! Cross-store price comparison payloads
//!
//! Shared by the comparison endpoint and the browser extension's detect call.

use std::collections::HashMap;

use dealhub_common::cache::{self, keys, ttl, Cache};
use dealhub_common::db::{AffiliateLink, BankOffer, Product};
use dealhub_common::time::now_timestamp;
use dealhub_common::Result;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;

use crate::db::prices::StorePrice;
use crate::db::{affiliate as link_db, offers, prices, products};

/// Prices returned for a title lookup
const TITLE_SEARCH_PRICE_LIMIT: i64 = 10;
/// Prices considered by the extension (best plus alternatives)
const EXTENSION_PRICE_LIMIT: usize = 5;
const EXTENSION_ALTERNATIVES: usize = 3;
const EXTENSION_BANK_OFFERS: i64 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonProduct {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub brand: Option<String>,
    pub rating: Option<f64>,
    pub review_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonPrice {
    pub store: String,
    pub store_name: String,
    pub logo: Option<String>,
    pub price: f64,
    pub original_price: Option<f64>,
    pub discount: Option<f64>,
    pub in_stock: bool,
    pub url: String,
    pub affiliate_url: Option<String>,
    pub recorded_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonOffer {
    pub title: String,
    pub description: Option<String>,
    pub store: String,
    pub valid_till: String,
}

/// Full comparison for one product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    pub product: ComparisonProduct,
    /// Cheapest first
    pub prices: Vec<ComparisonPrice>,
    pub offers: Vec<ComparisonOffer>,
    pub best_price: f64,
    /// Cheapest current price relative to the all-time low, in whole percent
    pub price_drop_percentage: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedProduct {
    pub id: String,
    pub title: String,
    pub image: Option<String>,
    pub brand: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreQuote {
    pub store: String,
    pub logo: Option<String>,
    pub price: f64,
    pub discount: Option<f64>,
    pub affiliate_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceDropAlertHint {
    pub enabled: bool,
    pub message: String,
}

/// What the extension shows next to a product page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionComparison {
    pub found: bool,
    pub product: DetectedProduct,
    pub best_price: f64,
    pub alternatives: Vec<StoreQuote>,
    pub bank_offers: Vec<BankOffer>,
    pub price_drop_alert: PriceDropAlertHint,
}

/// Comparison by product id, served from `product:{id}` when cached
pub async fn compare_by_id(pool: &SqlitePool, cache: &dyn Cache, product_id: &str) -> Result<Option<Comparison>> {
    let cache_key = keys::product(product_id);

    if let Some(cached) = cache::load_json::<Comparison>(cache, &cache_key).await {
        debug!("Comparison cache hit for {}", product_id);
        return Ok(Some(cached));
    }

    let Some(product) = products::get_product(pool, product_id).await? else {
        return Ok(None);
    };

    let comparison = build_comparison(pool, product, None).await?;
    cache::store_json(cache, &cache_key, &comparison, ttl::PRICES).await;

    Ok(Some(comparison))
}

/// Comparison for the first product whose title contains `title`
///
/// Only the ten cheapest prices are included. Title lookups are not cached.
pub async fn compare_by_title(pool: &SqlitePool, title: &str) -> Result<Option<Comparison>> {
    let Some(product) = products::find_product_by_title(pool, title).await? else {
        return Ok(None);
    };

    build_comparison(pool, product, Some(TITLE_SEARCH_PRICE_LIMIT))
        .await
        .map(Some)
}

/// Extension view for the first product whose title contains `title`
pub async fn detect_for_extension(pool: &SqlitePool, title: &str) -> Result<Option<ExtensionComparison>> {
    let Some(product) = products::find_product_by_title(pool, title).await? else {
        return Ok(None);
    };

    let now = now_timestamp();
    let store_prices = prices::prices_with_stores(pool, &product.id, Some(TITLE_SEARCH_PRICE_LIMIT)).await?;
    let links = affiliate_urls(link_db::active_links_for_product(pool, &product.id).await?);
    let bank_offers = offers::active_bank_offers(pool, &now, Some(EXTENSION_BANK_OFFERS)).await?;

    let quotes: Vec<StoreQuote> = store_prices
        .iter()
        .take(EXTENSION_PRICE_LIMIT)
        .map(|sp| StoreQuote {
            store: sp.store_display_name.clone(),
            logo: sp.store_logo.clone(),
            price: sp.record.price,
            discount: sp.record.discount,
            affiliate_url: links.get(&sp.record.store_id).cloned(),
        })
        .collect();

    let best_price = quotes.first().map(|q| q.price).unwrap_or(product.min_price);

    Ok(Some(ExtensionComparison {
        found: true,
        product: DetectedProduct {
            id: product.id,
            title: product.title,
            image: product.image_url,
            brand: product.brand,
        },
        best_price,
        alternatives: quotes.into_iter().skip(1).take(EXTENSION_ALTERNATIVES).collect(),
        bank_offers,
        price_drop_alert: PriceDropAlertHint {
            enabled: false,
            message: "Set price alert to get notified".to_string(),
        },
    }))
}

async fn build_comparison(pool: &SqlitePool, product: Product, price_limit: Option<i64>) -> Result<Comparison> {
    let store_prices = prices::prices_with_stores(pool, &product.id, price_limit).await?;
    let links = affiliate_urls(link_db::links_for_product(pool, &product.id).await?);
    let product_offers = offers::offers_for_product(pool, &product.id).await?;

    let best_price = store_prices
        .first()
        .map(|sp| sp.record.price)
        .unwrap_or(product.min_price);
    let price_drop_percentage = price_drop_percentage(
        store_prices.first().map(|sp| sp.record.price),
        product.lowest_ever_price,
    );

    Ok(Comparison {
        prices: store_prices
            .into_iter()
            .map(|sp| to_comparison_price(sp, &links))
            .collect(),
        offers: product_offers
            .into_iter()
            .map(|so| ComparisonOffer {
                title: so.offer.title,
                description: so.offer.description,
                store: so.store_display_name,
                valid_till: so.offer.valid_till,
            })
            .collect(),
        best_price,
        price_drop_percentage,
        product: ComparisonProduct {
            id: product.id,
            title: product.title,
            slug: product.slug,
            description: product.description,
            image: product.image_url,
            brand: product.brand,
            rating: product.rating,
            review_count: product.review_count,
        },
    })
}

fn to_comparison_price(sp: StorePrice, links: &HashMap<String, String>) -> ComparisonPrice {
    ComparisonPrice {
        affiliate_url: links.get(&sp.record.store_id).cloned(),
        store: sp.store_display_name,
        store_name: sp.store_name,
        logo: sp.store_logo,
        price: sp.record.price,
        original_price: sp.record.original_price,
        discount: sp.record.discount,
        in_stock: sp.record.in_stock,
        url: sp.record.url,
        recorded_at: sp.record.recorded_at,
    }
}

/// store_id -> affiliate URL
fn affiliate_urls(links: Vec<AffiliateLink>) -> HashMap<String, String> {
    links
        .into_iter()
        .map(|link| (link.store_id, link.affiliate_url))
        .collect()
}

/// `round((best - lowest_ever) / lowest_ever * 100)`, when both are known
pub fn price_drop_percentage(best_price: Option<f64>, lowest_ever_price: Option<f64>) -> Option<i64> {
    match (best_price, lowest_ever_price) {
        (Some(best), Some(lowest)) if lowest > 0.0 => Some(((best - lowest) / lowest * 100.0).round() as i64),
        _ => None,
    }
}
