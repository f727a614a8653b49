//! Database initialization
//!
//! Creates the database file and schema on first run and is safe to call on
//! every startup: tables use `CREATE TABLE IF NOT EXISTS`, seed rows use
//! `INSERT OR IGNORE`, and migrations are tracked in `schema_version`.

use crate::retailers::RETAILERS;
use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

/// Open (creating if needed) the database at `db_path` and bring the schema up to date
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;
    // WAL lets the API keep serving reads while the refresh job writes
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_schema(&pool).await?;
    crate::db::migrations::run_migrations(&pool).await?;
    seed_stores(&pool).await?;

    Ok(pool)
}

/// Create every table used by DealHub
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_users_table(pool).await?;
    create_stores_table(pool).await?;
    create_products_table(pool).await?;
    create_prices_table(pool).await?;
    create_offers_table(pool).await?;
    create_bank_offers_table(pool).await?;
    create_affiliate_links_table(pool).await?;
    create_click_logs_table(pool).await?;
    create_price_alerts_table(pool).await?;
    create_notifications_table(pool).await?;
    create_extension_events_table(pool).await?;
    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            name TEXT,
            api_key TEXT NOT NULL UNIQUE,
            affiliate_id TEXT NOT NULL UNIQUE,
            affiliate_balance REAL NOT NULL DEFAULT 0,
            affiliate_paid REAL NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_stores_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS stores (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            display_name TEXT NOT NULL,
            logo TEXT,
            website TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_products_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS products (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE,
            description TEXT,
            image_url TEXT,
            brand TEXT,
            category_id TEXT NOT NULL DEFAULT 'uncategorized',
            product_type TEXT NOT NULL DEFAULT 'uncategorized',
            rating REAL,
            review_count INTEGER NOT NULL DEFAULT 0,
            min_price REAL NOT NULL DEFAULT 0,
            max_price REAL NOT NULL DEFAULT 0,
            lowest_ever_price REAL,
            verified INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_prices_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS prices (
            id TEXT PRIMARY KEY,
            product_id TEXT NOT NULL REFERENCES products(id) ON DELETE CASCADE,
            store_id TEXT NOT NULL REFERENCES stores(id) ON DELETE CASCADE,
            price REAL NOT NULL,
            original_price REAL,
            discount REAL,
            in_stock INTEGER NOT NULL DEFAULT 1,
            url TEXT NOT NULL,
            recorded_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_offers_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS offers (
            id TEXT PRIMARY KEY,
            product_id TEXT REFERENCES products(id) ON DELETE CASCADE,
            store_id TEXT NOT NULL REFERENCES stores(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            description TEXT,
            valid_till TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_bank_offers_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bank_offers (
            id TEXT PRIMARY KEY,
            bank_name TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            discount_percent REAL,
            max_discount REAL,
            min_order_value REAL,
            valid_till TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_affiliate_links_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS affiliate_links (
            id TEXT PRIMARY KEY,
            product_id TEXT NOT NULL REFERENCES products(id) ON DELETE CASCADE,
            store_id TEXT NOT NULL REFERENCES stores(id) ON DELETE CASCADE,
            affiliate_url TEXT NOT NULL,
            affiliate_tag TEXT NOT NULL,
            commission_rate REAL NOT NULL DEFAULT 0,
            clicks INTEGER NOT NULL DEFAULT 0,
            active INTEGER NOT NULL DEFAULT 1,
            UNIQUE(product_id, store_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_click_logs_table(pool: &SqlitePool) -> Result<()> {
    // user_id is free text: anonymous clicks are logged as 'anonymous'
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS click_logs (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            affiliate_link_id TEXT NOT NULL REFERENCES affiliate_links(id) ON DELETE CASCADE,
            ip_address TEXT,
            user_agent TEXT,
            clicked_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_price_alerts_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS price_alerts (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            product_id TEXT NOT NULL REFERENCES products(id) ON DELETE CASCADE,
            target_price REAL NOT NULL,
            alert_type TEXT NOT NULL CHECK (alert_type IN ('below', 'drop_percentage')),
            drop_percentage REAL,
            is_active INTEGER NOT NULL DEFAULT 1,
            notified INTEGER NOT NULL DEFAULT 0,
            notification_sent_at TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_notifications_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS notifications (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            kind TEXT NOT NULL,
            title TEXT NOT NULL,
            message TEXT NOT NULL,
            link TEXT,
            sent_via TEXT NOT NULL DEFAULT '[]',
            is_read INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_extension_events_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS extension_events (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            event_type TEXT NOT NULL,
            product_url TEXT,
            product_title TEXT,
            store_name TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert every supported retailer that is not yet present
async fn seed_stores(pool: &SqlitePool) -> Result<()> {
    for retailer in RETAILERS {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO stores (id, name, display_name, website)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(retailer.name)
        .bind(retailer.display_name)
        .bind(format!("https://www.{}", retailer.domain))
        .execute(pool)
        .await?;
    }

    Ok(())
}
