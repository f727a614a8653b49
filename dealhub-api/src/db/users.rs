//! User account queries

use dealhub_common::db::User;
use dealhub_common::time::now_timestamp;
use dealhub_common::utils::{generate_affiliate_id, generate_api_key};
use dealhub_common::Result;
use sqlx::SqlitePool;
use uuid::Uuid;

pub async fn get_user(pool: &SqlitePool, id: &str) -> Result<Option<User>> {
    let row = sqlx::query("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(User::from_row).transpose()
}

pub async fn get_user_by_api_key(pool: &SqlitePool, api_key: &str) -> Result<Option<User>> {
    let row = sqlx::query("SELECT * FROM users WHERE api_key = ?")
        .bind(api_key)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(User::from_row).transpose()
}

pub async fn email_exists(pool: &SqlitePool, email: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = ? COLLATE NOCASE)")
        .bind(email)
        .fetch_one(pool)
        .await?;
    Ok(exists)
}

/// Create a user with a fresh API key and affiliate id
pub async fn create_user(pool: &SqlitePool, email: &str, name: Option<&str>) -> Result<User> {
    let user = User {
        id: Uuid::new_v4().to_string(),
        email: email.to_string(),
        name: name.map(str::to_string),
        api_key: generate_api_key(),
        affiliate_id: generate_affiliate_id(),
        affiliate_balance: 0.0,
        affiliate_paid: 0.0,
        created_at: now_timestamp(),
    };

    sqlx::query(
        r#"
        INSERT INTO users (id, email, name, api_key, affiliate_id, affiliate_balance, affiliate_paid, created_at)
        VALUES (?, ?, ?, ?, ?, 0, 0, ?)
        "#,
    )
    .bind(&user.id)
    .bind(&user.email)
    .bind(&user.name)
    .bind(&user.api_key)
    .bind(&user.affiliate_id)
    .bind(&user.created_at)
    .execute(pool)
    .await?;

    Ok(user)
}

/// Move `amount` from balance to paid if the balance covers it
///
/// Returns `false` when the user does not exist or the balance is too low.
pub async fn apply_payout(pool: &SqlitePool, user_id: &str, amount: f64) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET affiliate_balance = affiliate_balance - ?, affiliate_paid = affiliate_paid + ?
        WHERE id = ? AND affiliate_balance >= ?
        "#,
    )
    .bind(amount)
    .bind(amount)
    .bind(user_id)
    .bind(amount)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}
