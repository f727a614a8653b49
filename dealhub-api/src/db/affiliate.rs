//! Affiliate link and click log queries

use dealhub_common::db::{AffiliateLink, ClickLog};
use dealhub_common::time::now_timestamp;
use dealhub_common::Result;
use sqlx::SqlitePool;
use uuid::Uuid;

pub async fn get_link(pool: &SqlitePool, id: &str) -> Result<Option<AffiliateLink>> {
    let row = sqlx::query("SELECT * FROM affiliate_links WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(AffiliateLink::from_row).transpose()
}

/// Insert the (product, store) link or update it in place if it exists
pub async fn upsert_link(
    pool: &SqlitePool,
    product_id: &str,
    store_id: &str,
    affiliate_url: &str,
    affiliate_tag: &str,
    commission_rate: f64,
) -> Result<AffiliateLink> {
    let row = sqlx::query(
        r#"
        INSERT INTO affiliate_links (id, product_id, store_id, affiliate_url, affiliate_tag, commission_rate)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(product_id, store_id) DO UPDATE SET
            affiliate_url = excluded.affiliate_url,
            affiliate_tag = excluded.affiliate_tag,
            commission_rate = excluded.commission_rate
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(product_id)
    .bind(store_id)
    .bind(affiliate_url)
    .bind(affiliate_tag)
    .bind(commission_rate)
    .fetch_one(pool)
    .await?;

    AffiliateLink::from_row(&row)
}

/// Active links for a product, keyed by store downstream
pub async fn active_links_for_product(pool: &SqlitePool, product_id: &str) -> Result<Vec<AffiliateLink>> {
    let rows = sqlx::query("SELECT * FROM affiliate_links WHERE product_id = ? AND active = 1")
        .bind(product_id)
        .fetch_all(pool)
        .await?;

    rows.iter().map(AffiliateLink::from_row).collect()
}

/// Every link for a product regardless of state
pub async fn links_for_product(pool: &SqlitePool, product_id: &str) -> Result<Vec<AffiliateLink>> {
    let rows = sqlx::query("SELECT * FROM affiliate_links WHERE product_id = ?")
        .bind(product_id)
        .fetch_all(pool)
        .await?;

    rows.iter().map(AffiliateLink::from_row).collect()
}

/// Store a click and bump the link's counter in one transaction
pub async fn record_click(
    pool: &SqlitePool,
    affiliate_link_id: &str,
    user_id: &str,
    ip_address: Option<&str>,
    user_agent: Option<&str>,
) -> Result<ClickLog> {
    let click = ClickLog {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        affiliate_link_id: affiliate_link_id.to_string(),
        ip_address: ip_address.map(str::to_string),
        user_agent: user_agent.map(str::to_string),
        clicked_at: now_timestamp(),
    };

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO click_logs (id, user_id, affiliate_link_id, ip_address, user_agent, clicked_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&click.id)
    .bind(&click.user_id)
    .bind(&click.affiliate_link_id)
    .bind(&click.ip_address)
    .bind(&click.user_agent)
    .bind(&click.clicked_at)
    .execute(&mut *tx)
    .await?;

    sqlx::query("UPDATE affiliate_links SET clicks = clicks + 1 WHERE id = ?")
        .bind(affiliate_link_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(click)
}

/// (total clicks, distinct products clicked) for a user
pub async fn user_click_counts(pool: &SqlitePool, user_id: &str) -> Result<(i64, i64)> {
    let counts: (i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*), COUNT(DISTINCT l.product_id)
        FROM click_logs c
        JOIN affiliate_links l ON l.id = c.affiliate_link_id
        WHERE c.user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(counts)
}
