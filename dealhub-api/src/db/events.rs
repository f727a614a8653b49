//! Browser extension event log

use dealhub_common::db::ExtensionEvent;
use dealhub_common::time::now_timestamp;
use dealhub_common::Result;
use sqlx::SqlitePool;
use uuid::Uuid;

pub async fn create_extension_event(
    pool: &SqlitePool,
    user_id: &str,
    event_type: &str,
    product_url: Option<&str>,
    product_title: Option<&str>,
    store_name: Option<&str>,
) -> Result<ExtensionEvent> {
    let event = ExtensionEvent {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        event_type: event_type.to_string(),
        product_url: product_url.map(str::to_string),
        product_title: product_title.map(str::to_string),
        store_name: store_name.map(str::to_string),
        created_at: now_timestamp(),
    };

    sqlx::query(
        r#"
        INSERT INTO extension_events (id, user_id, event_type, product_url, product_title, store_name, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&event.id)
    .bind(&event.user_id)
    .bind(&event.event_type)
    .bind(&event.product_url)
    .bind(&event.product_title)
    .bind(&event.store_name)
    .bind(&event.created_at)
    .execute(pool)
    .await?;

    Ok(event)
}
