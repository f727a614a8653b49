//! Database schema migrations
//!
//! Versioned, idempotent migrations tracked in the `schema_version` table.
//! Table creation lives in [`crate::db::init`]; migrations cover everything
//! applied on top of the base schema (indexes, column additions, backfills).
//!
//! # Migration Guidelines
//!
//! 1. **Never modify existing migrations** - deployed databases have already run them
//! 2. **Always add new migrations** - one function per schema change
//! 3. **Keep them idempotent** - `IF NOT EXISTS`, or check `pragma_table_info` first

use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
///
/// **IMPORTANT:** Increment this when adding new migrations
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Get current schema version from database (0 when nothing has been applied)
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM sqlite_master
            WHERE type='table' AND name='schema_version'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("✓ Migration v1 completed");
    }

    Ok(())
}

/// v1: indexes for the refresh job, alert evaluation and title search
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    let statements = [
        "CREATE INDEX IF NOT EXISTS idx_prices_product_recorded ON prices(product_id, recorded_at)",
        "CREATE INDEX IF NOT EXISTS idx_prices_product_price ON prices(product_id, price)",
        "CREATE INDEX IF NOT EXISTS idx_products_verified ON products(verified)",
        "CREATE INDEX IF NOT EXISTS idx_alerts_pending ON price_alerts(is_active, notified)",
        "CREATE INDEX IF NOT EXISTS idx_alerts_user ON price_alerts(user_id)",
        "CREATE INDEX IF NOT EXISTS idx_click_logs_user ON click_logs(user_id)",
        "CREATE INDEX IF NOT EXISTS idx_offers_store ON offers(store_id, active, valid_till)",
    ];

    for statement in statements {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}
