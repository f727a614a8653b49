//! Test Helper Utilities
//!
//! Shared setup and seeding for dealhub-api integration tests

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use dealhub_api::db::{prices, products, stores, users};
use dealhub_api::services::EstimatedPriceSource;
use dealhub_api::{build_router, ApiSettings, AppState};
use dealhub_common::cache::{Cache, MemoryCache};
use dealhub_common::db::{init_database, PriceRecord, Product, User};
use serde_json::Value;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::util::ServiceExt;
use uuid::Uuid;

pub const CRON_SECRET: &str = "test-cron-secret";
pub const ADMIN_SECRET: &str = "test-admin-secret";

/// Fresh database and in-process cache
///
/// TempDir must be kept alive for the duration of the test.
pub async fn setup_state() -> (TempDir, AppState) {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("dealhub.db")).await.unwrap();

    let state = AppState::new(
        pool,
        Arc::new(MemoryCache::new()),
        Arc::new(EstimatedPriceSource),
        ApiSettings {
            cron_secret: Some(CRON_SECRET.to_string()),
            admin_secret: Some(ADMIN_SECRET.to_string()),
            refresh_concurrency: 4,
        },
    );

    (temp_dir, state)
}

pub fn setup_app(state: &AppState) -> Router {
    build_router(state.clone())
}

pub fn cache(state: &AppState) -> &dyn Cache {
    state.cache.as_ref()
}

pub async fn seed_product(pool: &SqlitePool, title: &str, min_price: f64, max_price: f64, verified: bool) -> Product {
    products::create_product(
        pool,
        &products::NewProduct {
            title: title.to_string(),
            slug: format!("{}-{}", dealhub_common::utils::slugify(title), &Uuid::new_v4().simple().to_string()[..6]),
            category_id: "phones".to_string(),
            product_type: "smartphone".to_string(),
            min_price,
            max_price,
            verified,
        },
    )
    .await
    .unwrap()
}

pub async fn store_id(pool: &SqlitePool, name: &str) -> String {
    stores::get_store_by_name(pool, name).await.unwrap().unwrap().id
}

pub async fn seed_price(pool: &SqlitePool, product_id: &str, store_name: &str, price: f64) -> PriceRecord {
    prices::insert_price(
        pool,
        &prices::NewPrice {
            product_id: product_id.to_string(),
            store_id: store_id(pool, store_name).await,
            price,
            original_price: Some(price * 1.2),
            discount: Some(17.0),
            in_stock: true,
            url: format!("https://www.example.com/{}/{}", store_name, product_id),
        },
    )
    .await
    .unwrap()
}

pub async fn seed_user(pool: &SqlitePool, email: &str) -> User {
    users::create_user(pool, email, Some("Test User")).await.unwrap()
}

pub async fn set_balance(pool: &SqlitePool, user_id: &str, balance: f64) {
    sqlx::query("UPDATE users SET affiliate_balance = ? WHERE id = ?")
        .bind(balance)
        .bind(user_id)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn seed_bank_offer(pool: &SqlitePool, bank_name: &str, valid_till: &str, active: bool) {
    sqlx::query(
        r#"
        INSERT INTO bank_offers (id, bank_name, title, description, discount_percent, max_discount, min_order_value, valid_till, active)
        VALUES (?, ?, ?, NULL, 10, 1500, 5000, ?, ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(bank_name)
    .bind(format!("{} card offer", bank_name))
    .bind(valid_till)
    .bind(active)
    .execute(pool)
    .await
    .unwrap();
}

pub async fn seed_offer(pool: &SqlitePool, product_id: Option<&str>, store_name: &str, title: &str, valid_till: &str) {
    sqlx::query(
        r#"
        INSERT INTO offers (id, product_id, store_id, title, description, valid_till, active)
        VALUES (?, ?, ?, ?, NULL, ?, 1)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(product_id)
    .bind(store_id(pool, store_name).await)
    .bind(title)
    .bind(valid_till)
    .execute(pool)
    .await
    .unwrap();
}

/// Build a request with an optional JSON body and extra headers
pub fn test_request(method: &str, uri: &str, body: Option<Value>, headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }

    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Send one request, returning status and parsed JSON body (Null when empty)
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body");

    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Should parse JSON")
    };

    (status, body)
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}
