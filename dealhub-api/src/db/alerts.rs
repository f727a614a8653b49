//! Price alert queries

use dealhub_common::db::{AlertType, PriceAlert};
use dealhub_common::time::now_timestamp;
use dealhub_common::Result;
use sqlx::{sqlite::SqliteRow, Row, Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

/// Active, not yet notified alert together with what evaluation needs
#[derive(Debug, Clone)]
pub struct PendingAlert {
    pub alert: PriceAlert,
    pub product_title: String,
    pub product_slug: String,
    pub product_min_price: f64,
    pub product_max_price: f64,
    /// Price of the most recent price record, if any
    pub latest_price: Option<f64>,
}

impl PendingAlert {
    fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            alert: PriceAlert::from_row(row)?,
            product_title: row.try_get("product_title")?,
            product_slug: row.try_get("product_slug")?,
            product_min_price: row.try_get("product_min_price")?,
            product_max_price: row.try_get("product_max_price")?,
            latest_price: row.try_get("latest_price")?,
        })
    }
}

pub async fn create_alert(
    pool: &SqlitePool,
    user_id: &str,
    product_id: &str,
    target_price: f64,
    alert_type: AlertType,
    drop_percentage: Option<f64>,
) -> Result<PriceAlert> {
    let alert = PriceAlert {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        product_id: product_id.to_string(),
        target_price,
        alert_type,
        drop_percentage,
        is_active: true,
        notified: false,
        notification_sent_at: None,
        created_at: now_timestamp(),
    };

    sqlx::query(
        r#"
        INSERT INTO price_alerts (id, user_id, product_id, target_price, alert_type, drop_percentage, is_active, notified, created_at)
        VALUES (?, ?, ?, ?, ?, ?, 1, 0, ?)
        "#,
    )
    .bind(&alert.id)
    .bind(&alert.user_id)
    .bind(&alert.product_id)
    .bind(alert.target_price)
    .bind(alert.alert_type.as_str())
    .bind(alert.drop_percentage)
    .bind(&alert.created_at)
    .execute(pool)
    .await?;

    Ok(alert)
}

/// A user's alerts, newest first
pub async fn list_user_alerts(pool: &SqlitePool, user_id: &str) -> Result<Vec<PriceAlert>> {
    let rows = sqlx::query("SELECT * FROM price_alerts WHERE user_id = ? ORDER BY created_at DESC")
        .bind(user_id)
        .fetch_all(pool)
        .await?;

    rows.iter().map(PriceAlert::from_row).collect()
}

/// Switch off one of the user's alerts; `false` if no such alert belongs to them
pub async fn deactivate_alert(pool: &SqlitePool, alert_id: &str, user_id: &str) -> Result<bool> {
    let result = sqlx::query("UPDATE price_alerts SET is_active = 0 WHERE id = ? AND user_id = ?")
        .bind(alert_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() == 1)
}

/// Alerts that are active and have not fired yet
pub async fn pending_alerts(pool: &SqlitePool) -> Result<Vec<PendingAlert>> {
    let rows = sqlx::query(
        r#"
        SELECT a.*,
               p.title AS product_title,
               p.slug AS product_slug,
               p.min_price AS product_min_price,
               p.max_price AS product_max_price,
               (SELECT pr.price FROM prices pr
                WHERE pr.product_id = a.product_id
                ORDER BY pr.recorded_at DESC
                LIMIT 1) AS latest_price
        FROM price_alerts a
        JOIN products p ON p.id = a.product_id
        WHERE a.is_active = 1 AND a.notified = 0
        ORDER BY a.created_at ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(PendingAlert::from_row).collect()
}

/// Flag an alert as delivered, inside the transaction that stores its notification
///
/// Returns `false` when the alert was already notified or switched off, so
/// overlapping alert runs deliver each alert once.
pub async fn mark_notified(tx: &mut Transaction<'_, Sqlite>, alert_id: &str, sent_at: &str) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE price_alerts SET notified = 1, notification_sent_at = ?
        WHERE id = ? AND notified = 0 AND is_active = 1
        "#,
    )
    .bind(sent_at)
    .bind(alert_id)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected() == 1)
}
