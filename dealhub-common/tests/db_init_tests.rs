//! Database initialization tests
//!
//! Covers first-run creation, idempotent re-open, store seeding and
//! migration tracking.

use dealhub_common::db::{get_schema_version, init_database, CURRENT_SCHEMA_VERSION};
use dealhub_common::retailers::RETAILERS;

#[tokio::test]
async fn test_database_created_when_missing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("dealhub.db");

    let pool = init_database(&db_path).await;
    assert!(pool.is_ok(), "Database initialization failed: {:?}", pool.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_reopen_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("dealhub.db");

    let first = init_database(&db_path).await.unwrap();
    first.close().await;

    let second = init_database(&db_path).await.unwrap();

    let store_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stores")
        .fetch_one(&second)
        .await
        .unwrap();
    assert_eq!(store_count, RETAILERS.len() as i64, "stores seeded twice");

    let versions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_version")
        .fetch_one(&second)
        .await
        .unwrap();
    assert_eq!(versions, 1, "migrations re-applied");
}

#[tokio::test]
async fn test_schema_version_current_after_init() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("dealhub.db")).await.unwrap();

    assert_eq!(get_schema_version(&pool).await.unwrap(), CURRENT_SCHEMA_VERSION);
}

#[tokio::test]
async fn test_expected_tables_exist() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("dealhub.db")).await.unwrap();

    for table in [
        "users",
        "stores",
        "products",
        "prices",
        "offers",
        "bank_offers",
        "affiliate_links",
        "click_logs",
        "price_alerts",
        "notifications",
        "extension_events",
    ] {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name = ?)",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert!(exists, "table {} missing", table);
    }
}

#[tokio::test]
async fn test_alert_type_constraint_enforced() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("dealhub.db")).await.unwrap();

    sqlx::query(
        "INSERT INTO users (id, email, api_key, affiliate_id, created_at) VALUES ('u1', 'a@b.in', 'k', 'aff', 'now')",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO products (id, title, slug, created_at, updated_at) VALUES ('p1', 'T', 't', 'now', 'now')",
    )
    .execute(&pool)
    .await
    .unwrap();

    let bad = sqlx::query(
        "INSERT INTO price_alerts (id, user_id, product_id, target_price, alert_type, created_at) VALUES ('a1', 'u1', 'p1', 10, 'above', 'now')",
    )
    .execute(&pool)
    .await;
    assert!(bad.is_err());
}
