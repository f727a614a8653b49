//! Store and bank offer queries
//!
//! "Active" means the `active` flag is set and `valid_till` lies in the future.

use dealhub_common::db::{BankOffer, Offer};
use dealhub_common::Result;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

/// Offer joined with its store's display name
#[derive(Debug, Clone)]
pub struct StoreOffer {
    pub offer: Offer,
    pub store_display_name: String,
}

impl StoreOffer {
    fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            offer: Offer::from_row(row)?,
            store_display_name: row.try_get("store_display_name")?,
        })
    }
}

/// Every offer attached to a product (including expired ones)
pub async fn offers_for_product(pool: &SqlitePool, product_id: &str) -> Result<Vec<StoreOffer>> {
    let rows = sqlx::query(
        r#"
        SELECT o.*, s.display_name AS store_display_name
        FROM offers o
        JOIN stores s ON s.id = o.store_id
        WHERE o.product_id = ?
        ORDER BY o.valid_till ASC
        "#,
    )
    .bind(product_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(StoreOffer::from_row).collect()
}

/// Active offers for a store
pub async fn active_offers_for_store(pool: &SqlitePool, store_id: &str, now: &str) -> Result<Vec<Offer>> {
    let rows = sqlx::query(
        r#"
        SELECT * FROM offers
        WHERE store_id = ? AND active = 1 AND valid_till > ?
        ORDER BY valid_till ASC
        "#,
    )
    .bind(store_id)
    .bind(now)
    .fetch_all(pool)
    .await?;

    rows.iter().map(Offer::from_row).collect()
}

/// Active bank offers, soonest expiry first
pub async fn active_bank_offers(pool: &SqlitePool, now: &str, limit: Option<i64>) -> Result<Vec<BankOffer>> {
    let rows = sqlx::query(
        r#"
        SELECT * FROM bank_offers
        WHERE active = 1 AND valid_till > ?
        ORDER BY valid_till ASC
        LIMIT ?
        "#,
    )
    .bind(now)
    .bind(limit.unwrap_or(-1))
    .fetch_all(pool)
    .await?;

    rows.iter().map(BankOffer::from_row).collect()
}
