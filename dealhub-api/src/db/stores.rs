//! Store queries

use dealhub_common::db::Store;
use dealhub_common::Result;
use sqlx::SqlitePool;

pub async fn get_store_by_name(pool: &SqlitePool, name: &str) -> Result<Option<Store>> {
    let row = sqlx::query("SELECT * FROM stores WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(Store::from_row).transpose()
}

/// Every store, by display name
pub async fn list_stores(pool: &SqlitePool) -> Result<Vec<Store>> {
    let rows = sqlx::query("SELECT * FROM stores ORDER BY display_name")
        .fetch_all(pool)
        .await?;

    rows.iter().map(Store::from_row).collect()
}
