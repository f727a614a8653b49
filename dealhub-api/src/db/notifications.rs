//! User notification queries

use dealhub_common::db::Notification;
use dealhub_common::time::now_timestamp;
use dealhub_common::{Error, Result};
use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

/// Notification content before it is stored
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: String,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    pub sent_via: Vec<String>,
}

/// Insert inside an open transaction
pub async fn create_notification(
    tx: &mut Transaction<'_, Sqlite>,
    new: &NewNotification,
) -> Result<Notification> {
    let notification = Notification {
        id: Uuid::new_v4().to_string(),
        user_id: new.user_id.clone(),
        kind: new.kind.clone(),
        title: new.title.clone(),
        message: new.message.clone(),
        link: new.link.clone(),
        sent_via: new.sent_via.clone(),
        is_read: false,
        created_at: now_timestamp(),
    };
    let sent_via = serde_json::to_string(&notification.sent_via)
        .map_err(|e| Error::Internal(format!("Could not encode sent_via: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO notifications (id, user_id, kind, title, message, link, sent_via, is_read, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?)
        "#,
    )
    .bind(&notification.id)
    .bind(&notification.user_id)
    .bind(&notification.kind)
    .bind(&notification.title)
    .bind(&notification.message)
    .bind(&notification.link)
    .bind(sent_via)
    .bind(&notification.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(notification)
}

/// A user's notifications, newest first
pub async fn list_user_notifications(pool: &SqlitePool, user_id: &str) -> Result<Vec<Notification>> {
    let rows = sqlx::query("SELECT * FROM notifications WHERE user_id = ? ORDER BY created_at DESC")
        .bind(user_id)
        .fetch_all(pool)
        .await?;

    rows.iter().map(Notification::from_row).collect()
}
