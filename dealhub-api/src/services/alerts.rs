//! Price alert evaluation
//!
//! Walks every pending alert, compares it with the product's latest price and
//! notifies the owner when the alert condition holds.

use dealhub_common::cache::{self, keys, Cache};
use dealhub_common::db::{AlertType, PriceAlert};
use dealhub_common::time::now_timestamp;
use dealhub_common::utils::format_inr;
use dealhub_common::Result;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::db::alerts::{self as alert_db, PendingAlert};
use crate::db::notifications::{self, NewNotification};

pub const PRICE_ALERT_KIND: &str = "price_alert";

/// Outcome of one evaluation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AlertSummary {
    pub processed: usize,
    pub triggered: usize,
    pub failed: usize,
}

/// Whether `alert` fires at `latest_price` given the product's `max_price`
pub fn should_alert(alert: &PriceAlert, latest_price: f64, max_price: f64) -> bool {
    match alert.alert_type {
        AlertType::Below => latest_price <= alert.target_price,
        AlertType::DropPercentage => match alert.drop_percentage {
            Some(threshold) if max_price > 0.0 => {
                (max_price - latest_price) / max_price * 100.0 >= threshold
            }
            _ => false,
        },
    }
}

/// Evaluate all active, unnotified alerts
pub async fn trigger_price_alerts(pool: &SqlitePool, cache: &dyn Cache) -> Result<AlertSummary> {
    let pending = alert_db::pending_alerts(pool).await?;

    let mut summary = AlertSummary {
        processed: pending.len(),
        ..Default::default()
    };

    for item in &pending {
        let latest = item.latest_price.unwrap_or(item.product_min_price);
        if !should_alert(&item.alert, latest, item.product_max_price) {
            continue;
        }

        match notify(pool, item, latest).await {
            Ok(true) => {
                summary.triggered += 1;
                cache::invalidate(cache, &keys::user_alerts(&item.alert.user_id)).await;
            }
            Ok(false) => debug!("Alert {} already delivered", item.alert.id),
            Err(e) => {
                summary.failed += 1;
                warn!("Failed to deliver alert {}: {}", item.alert.id, e);
            }
        }
    }

    info!(
        "Alert check complete: {} processed, {} triggered, {} failed",
        summary.processed, summary.triggered, summary.failed
    );

    Ok(summary)
}

/// Flag the alert and store its notification in one transaction
///
/// `false` means another run claimed the alert first; nothing is written.
async fn notify(pool: &SqlitePool, item: &PendingAlert, latest_price: f64) -> Result<bool> {
    let mut tx = pool.begin().await?;

    if !alert_db::mark_notified(&mut tx, &item.alert.id, &now_timestamp()).await? {
        tx.rollback().await?;
        return Ok(false);
    }

    notifications::create_notification(
        &mut tx,
        &NewNotification {
            user_id: item.alert.user_id.clone(),
            kind: PRICE_ALERT_KIND.to_string(),
            title: format!("Price Alert: {}", item.product_title),
            message: format!("Price dropped to {}!", format_inr(latest_price)),
            link: Some(format!("/products/{}", item.product_slug)),
            sent_via: vec!["email".to_string(), "push".to_string()],
        },
    )
    .await?;

    tx.commit().await?;
    Ok(true)
}
