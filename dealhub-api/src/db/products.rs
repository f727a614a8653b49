//! Product catalog queries

use dealhub_common::db::Product;
use dealhub_common::time::now_timestamp;
use dealhub_common::Result;
use sqlx::{Executor, Sqlite, SqlitePool};
use uuid::Uuid;

use super::like_escape;

/// Fields for a new catalog entry
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub title: String,
    pub slug: String,
    pub category_id: String,
    pub product_type: String,
    pub min_price: f64,
    pub max_price: f64,
    pub verified: bool,
}

pub async fn get_product(pool: &SqlitePool, id: &str) -> Result<Option<Product>> {
    let row = sqlx::query("SELECT * FROM products WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(Product::from_row).transpose()
}

/// First product whose title contains `title`, ignoring ASCII case
///
/// Verified products win over unverified ones, then the oldest entry.
pub async fn find_product_by_title(pool: &SqlitePool, title: &str) -> Result<Option<Product>> {
    let row = sqlx::query(
        r#"
        SELECT * FROM products
        WHERE title LIKE '%' || ? || '%' ESCAPE '\'
        ORDER BY verified DESC, created_at ASC
        LIMIT 1
        "#,
    )
    .bind(like_escape(title))
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(Product::from_row).transpose()
}

/// Ids of every verified product (the price refresh set)
pub async fn verified_product_ids(pool: &SqlitePool) -> Result<Vec<String>> {
    let ids = sqlx::query_scalar("SELECT id FROM products WHERE verified = 1 ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(ids)
}

pub async fn slug_exists(pool: &SqlitePool, slug: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE slug = ?)")
        .bind(slug)
        .fetch_one(pool)
        .await?;
    Ok(exists)
}

pub async fn create_product(pool: &SqlitePool, new: &NewProduct) -> Result<Product> {
    let id = Uuid::new_v4().to_string();
    let now = now_timestamp();

    sqlx::query(
        r#"
        INSERT INTO products (id, title, slug, category_id, product_type, min_price, max_price, verified, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&new.title)
    .bind(&new.slug)
    .bind(&new.category_id)
    .bind(&new.product_type)
    .bind(new.min_price)
    .bind(new.max_price)
    .bind(new.verified)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    Ok(Product {
        id,
        title: new.title.clone(),
        slug: new.slug.clone(),
        description: None,
        image_url: None,
        brand: None,
        category_id: new.category_id.clone(),
        product_type: new.product_type.clone(),
        rating: None,
        review_count: 0,
        min_price: new.min_price,
        max_price: new.max_price,
        lowest_ever_price: None,
        verified: new.verified,
        created_at: now.clone(),
        updated_at: now,
    })
}

/// Record the current price range and all-time low
pub async fn update_price_bounds<'e, E>(
    executor: E,
    id: &str,
    min_price: f64,
    max_price: f64,
    lowest_ever_price: f64,
) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        UPDATE products
        SET min_price = ?, max_price = ?, lowest_ever_price = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(min_price)
    .bind(max_price)
    .bind(lowest_ever_price)
    .bind(now_timestamp())
    .bind(id)
    .execute(executor)
    .await?;

    Ok(())
}
