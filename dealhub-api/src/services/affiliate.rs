//! Affiliate links, click tracking, commissions and payouts

use dealhub_common::affiliate::is_valid_affiliate_url;
use dealhub_common::db::{AffiliateLink, ClickLog};
use dealhub_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;

use crate::db::{affiliate as link_db, prices, products, users};

/// User id recorded for clicks without a known user
pub const ANONYMOUS_USER: &str = "anonymous";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAffiliateLink {
    pub product_id: String,
    pub store_id: String,
    pub affiliate_url: String,
    pub affiliate_tag: String,
    pub commission_rate: f64,
}

/// Who clicked, and from where
#[derive(Debug, Clone, Default)]
pub struct ClickContext {
    pub user_id: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AffiliateStats {
    pub total_clicks: i64,
    pub unique_products: i64,
    pub earnings: f64,
    pub paid: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutReceipt {
    pub user_id: String,
    pub amount: f64,
    pub affiliate_balance: f64,
    pub affiliate_paid: f64,
}

/// Create the (product, store) link, or update the existing one
pub async fn create_affiliate_link(pool: &SqlitePool, new: &NewAffiliateLink) -> Result<AffiliateLink> {
    if !is_valid_affiliate_url(&new.affiliate_url) {
        return Err(Error::InvalidInput("Invalid affiliate URL domain".to_string()));
    }
    if !new.commission_rate.is_finite() || new.commission_rate < 0.0 {
        return Err(Error::InvalidInput("Commission rate must be non-negative".to_string()));
    }

    let link = link_db::upsert_link(
        pool,
        &new.product_id,
        &new.store_id,
        &new.affiliate_url,
        &new.affiliate_tag,
        new.commission_rate,
    )
    .await
    .map_err(|e| match e {
        // Foreign key failure: product or store does not exist
        Error::Database(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => {
            Error::NotFound("Product or store not found".to_string())
        }
        other => other,
    })?;

    info!("Affiliate link {} saved for product {}", link.id, link.product_id);
    Ok(link)
}

/// Log a click on an active link and bump its counter
pub async fn track_affiliate_click(
    pool: &SqlitePool,
    affiliate_link_id: &str,
    context: &ClickContext,
) -> Result<ClickLog> {
    let active = link_db::get_link(pool, affiliate_link_id)
        .await?
        .is_some_and(|link| link.active);
    if !active {
        return Err(Error::NotFound("Affiliate link not found".to_string()));
    }

    link_db::record_click(
        pool,
        affiliate_link_id,
        context.user_id.as_deref().unwrap_or(ANONYMOUS_USER),
        context.ip_address.as_deref(),
        context.user_agent.as_deref(),
    )
    .await
}

/// Click totals and earnings for a user; `None` for an unknown user
pub async fn user_affiliate_stats(pool: &SqlitePool, user_id: &str) -> Result<Option<AffiliateStats>> {
    let Some(user) = users::get_user(pool, user_id).await? else {
        return Ok(None);
    };

    let (total_clicks, unique_products) = link_db::user_click_counts(pool, user_id).await?;

    Ok(Some(AffiliateStats {
        total_clicks,
        unique_products,
        earnings: user.affiliate_balance,
        paid: user.affiliate_paid,
    }))
}

/// Commission one sale through the link would earn at today's price
pub async fn calculate_commission(pool: &SqlitePool, affiliate_link_id: &str) -> Result<f64> {
    let link = link_db::get_link(pool, affiliate_link_id)
        .await?
        .ok_or_else(|| Error::NotFound("Affiliate link not found".to_string()))?;

    let current_price = match prices::latest_price(pool, &link.product_id).await? {
        Some(record) => record.price,
        None => {
            products::get_product(pool, &link.product_id)
                .await?
                .ok_or_else(|| Error::NotFound("Product not found".to_string()))?
                .min_price
        }
    };

    Ok(current_price * link.commission_rate / 100.0)
}

/// Move `amount` of a user's affiliate balance to paid
pub async fn payout(pool: &SqlitePool, user_id: &str, amount: f64) -> Result<PayoutReceipt> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::InvalidInput("Payout amount must be positive".to_string()));
    }

    if users::get_user(pool, user_id).await?.is_none() {
        return Err(Error::NotFound("User not found".to_string()));
    }

    if !users::apply_payout(pool, user_id, amount).await? {
        return Err(Error::InvalidInput("Insufficient balance".to_string()));
    }

    let user = users::get_user(pool, user_id)
        .await?
        .ok_or_else(|| Error::NotFound("User not found".to_string()))?;

    info!("Paid out {:.2} to user {}", amount, user_id);

    Ok(PayoutReceipt {
        user_id: user.id,
        amount,
        affiliate_balance: user.affiliate_balance,
        affiliate_paid: user.affiliate_paid,
    })
}
