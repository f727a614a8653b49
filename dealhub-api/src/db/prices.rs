//! Price record queries

use dealhub_common::db::PriceRecord;
use dealhub_common::time::now_timestamp;
use dealhub_common::Result;
use sqlx::{sqlite::SqliteRow, Executor, Row, Sqlite, SqlitePool};
use uuid::Uuid;

/// Price observation ready to be stored
#[derive(Debug, Clone)]
pub struct NewPrice {
    pub product_id: String,
    pub store_id: String,
    pub price: f64,
    pub original_price: Option<f64>,
    pub discount: Option<f64>,
    pub in_stock: bool,
    pub url: String,
}

/// Price record joined with the store it was observed at
#[derive(Debug, Clone)]
pub struct StorePrice {
    pub record: PriceRecord,
    pub store_name: String,
    pub store_display_name: String,
    pub store_logo: Option<String>,
}

impl StorePrice {
    fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            record: PriceRecord::from_row(row)?,
            store_name: row.try_get("store_name")?,
            store_display_name: row.try_get("store_display_name")?,
            store_logo: row.try_get("store_logo")?,
        })
    }
}

/// Store one price record; runs on the pool or inside a caller's transaction
pub async fn insert_price<'e, E>(executor: E, new: &NewPrice) -> Result<PriceRecord>
where
    E: Executor<'e, Database = Sqlite>,
{
    let record = PriceRecord {
        id: Uuid::new_v4().to_string(),
        product_id: new.product_id.clone(),
        store_id: new.store_id.clone(),
        price: new.price,
        original_price: new.original_price,
        discount: new.discount,
        in_stock: new.in_stock,
        url: new.url.clone(),
        recorded_at: now_timestamp(),
    };

    sqlx::query(
        r#"
        INSERT INTO prices (id, product_id, store_id, price, original_price, discount, in_stock, url, recorded_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&record.id)
    .bind(&record.product_id)
    .bind(&record.store_id)
    .bind(record.price)
    .bind(record.original_price)
    .bind(record.discount)
    .bind(record.in_stock)
    .bind(&record.url)
    .bind(&record.recorded_at)
    .execute(executor)
    .await?;

    Ok(record)
}

/// Most recently recorded price for a product
pub async fn latest_price(pool: &SqlitePool, product_id: &str) -> Result<Option<PriceRecord>> {
    let row = sqlx::query(
        "SELECT * FROM prices WHERE product_id = ? ORDER BY recorded_at DESC LIMIT 1",
    )
    .bind(product_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(PriceRecord::from_row).transpose()
}

/// Price records for a product, cheapest first, optionally capped at `limit`
pub async fn prices_with_stores(
    pool: &SqlitePool,
    product_id: &str,
    limit: Option<i64>,
) -> Result<Vec<StorePrice>> {
    // SQLite treats a negative LIMIT as "no limit"
    let rows = sqlx::query(
        r#"
        SELECT p.*, s.name AS store_name, s.display_name AS store_display_name, s.logo AS store_logo
        FROM prices p
        JOIN stores s ON s.id = p.store_id
        WHERE p.product_id = ?
        ORDER BY p.price ASC, p.recorded_at DESC
        LIMIT ?
        "#,
    )
    .bind(product_id)
    .bind(limit.unwrap_or(-1))
    .fetch_all(pool)
    .await?;

    rows.iter().map(StorePrice::from_row).collect()
}
