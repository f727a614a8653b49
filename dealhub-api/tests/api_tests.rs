//! Integration tests for dealhub-api endpoints
//!
//! Each test runs the full router against a temporary SQLite database and
//! the in-process cache.

mod helpers;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use dealhub_api::db::{affiliate as link_db, products};
use dealhub_common::cache::{self, keys, Cache};
use dealhub_common::db::PriceAlert;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use helpers::*;

const FUTURE: &str = "2099-12-31T00:00:00.000Z";
const PAST: &str = "2000-01-01T00:00:00.000Z";

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (_dir, state) = setup_state().await;
    let app = setup_app(&state);

    let (status, body) = send(&app, test_request("GET", "/health", None, &[])).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "dealhub-api");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_buildinfo_endpoint() {
    let (_dir, state) = setup_state().await;
    let app = setup_app(&state);

    let (status, body) = send(&app, test_request("GET", "/api/buildinfo", None, &[])).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["git_hash"].is_string());
    assert!(body["build_profile"].is_string());
}

// =============================================================================
// Comparison
// =============================================================================

#[tokio::test]
async fn test_compare_requires_id_or_title() {
    let (_dir, state) = setup_state().await;
    let app = setup_app(&state);

    let (status, body) = send(
        &app,
        test_request("POST", "/api/products/compare", Some(json!({ "productTitle": "  " })), &[]),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Product ID or title required");
}

#[tokio::test]
async fn test_compare_unknown_product() {
    let (_dir, state) = setup_state().await;
    let app = setup_app(&state);

    let (status, body) = send(
        &app,
        test_request("POST", "/api/products/compare", Some(json!({ "productId": "missing" })), &[]),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Product not found");
    assert_eq!(body["similar"], json!([]));
}

#[tokio::test]
async fn test_compare_by_id_sorts_prices_and_caches() {
    let (_dir, state) = setup_state().await;
    let app = setup_app(&state);

    let product = seed_product(&state.db, "Galaxy S24 Ultra", 900.0, 1000.0, true).await;
    seed_price(&state.db, &product.id, "amazon", 950.0).await;
    seed_price(&state.db, &product.id, "flipkart", 900.0).await;
    seed_price(&state.db, &product.id, "croma", 1000.0).await;
    products::update_price_bounds(&state.db, &product.id, 900.0, 1000.0, 800.0)
        .await
        .unwrap();
    seed_offer(&state.db, Some(&product.id), "amazon", "Exchange bonus", FUTURE).await;

    let request = || {
        test_request(
            "POST",
            "/api/products/compare",
            Some(json!({ "productId": product.id })),
            &[],
        )
    };

    let (status, body) = send(&app, request()).await;
    assert_eq!(status, StatusCode::OK);

    let prices: Vec<f64> = body["prices"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["price"].as_f64().unwrap())
        .collect();
    assert_eq!(prices, vec![900.0, 950.0, 1000.0]);
    assert_eq!(body["prices"][0]["storeName"], "flipkart");
    assert_eq!(body["bestPrice"], 900.0);
    // (900 - 800) / 800 = 12.5%
    assert_eq!(body["priceDropPercentage"], 13);
    assert_eq!(body["product"]["title"], "Galaxy S24 Ultra");
    assert_eq!(body["offers"][0]["title"], "Exchange bonus");

    assert!(cache(&state).get(&keys::product(&product.id)).await.unwrap().is_some());

    // Served from cache even after the rows change
    sqlx::query("DELETE FROM prices").execute(&state.db).await.unwrap();
    let (_, cached) = send(&app, request()).await;
    assert_eq!(cached["bestPrice"], 900.0);
    assert_eq!(cached["prices"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_compare_by_title_is_case_insensitive() {
    let (_dir, state) = setup_state().await;
    let app = setup_app(&state);

    let product = seed_product(&state.db, "Apple iPhone 15 (128 GB)", 70000.0, 80000.0, true).await;
    for i in 0..12 {
        seed_price(&state.db, &product.id, "amazon", 70000.0 + i as f64 * 100.0).await;
    }

    let (status, body) = send(
        &app,
        test_request("POST", "/api/products/compare", Some(json!({ "productTitle": "IPHONE 15" })), &[]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["product"]["id"], product.id.as_str());
    assert_eq!(body["prices"].as_array().unwrap().len(), 10);
    assert_eq!(body["bestPrice"], 70000.0);
    assert!(body["priceDropPercentage"].is_null());
}

#[tokio::test]
async fn test_compare_without_prices_uses_min_price() {
    let (_dir, state) = setup_state().await;
    let app = setup_app(&state);

    let product = seed_product(&state.db, "OnePlus 12", 64999.0, 69999.0, true).await;

    let (status, body) = send(
        &app,
        test_request("POST", "/api/products/compare", Some(json!({ "productId": product.id })), &[]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bestPrice"], 64999.0);
    assert_eq!(body["prices"], json!([]));
}

#[tokio::test]
async fn test_compare_rate_limited_per_ip() {
    let (_dir, state) = setup_state().await;
    let app = setup_app(&state);

    let request = |ip: &str| {
        test_request(
            "POST",
            "/api/products/compare",
            Some(json!({})),
            &[("x-forwarded-for", ip)],
        )
    };

    for _ in 0..20 {
        let (status, _) = send(&app, request("203.0.113.9")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (status, body) = send(&app, request("203.0.113.9")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "Rate limit exceeded");
    let reset_in = body["resetIn"].as_i64().unwrap();
    assert!(reset_in > 0 && reset_in <= 60);

    // Another client has its own window
    let (status, _) = send(&app, request("203.0.113.10")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Extension detect
// =============================================================================

#[tokio::test]
async fn test_detect_requires_title() {
    let (_dir, state) = setup_state().await;
    let app = setup_app(&state);

    let (status, body) = send(
        &app,
        test_request(
            "POST",
            "/api/extension/detect",
            Some(json!({ "currentUrl": "https://www.amazon.in/dp/B0X" })),
            &[],
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Product title required");
    assert!(body["comparison"].is_null());
}

#[tokio::test]
async fn test_detect_unknown_product() {
    let (_dir, state) = setup_state().await;
    let app = setup_app(&state);

    let (status, body) = send(
        &app,
        test_request("POST", "/api/extension/detect", Some(json!({ "productTitle": "Nokia 3310" })), &[]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["found"], false);
    assert_eq!(body["message"], "Product not in database");
    assert!(body["comparison"].is_null());
}

#[tokio::test]
async fn test_detect_found_logs_event_and_caches() {
    let (_dir, state) = setup_state().await;
    let app = setup_app(&state);

    let product = seed_product(&state.db, "Sony WH-1000XM5", 25000.0, 30000.0, true).await;
    for (store, price) in [
        ("amazon", 26000.0),
        ("flipkart", 25500.0),
        ("croma", 27000.0),
        ("reliance", 26500.0),
        ("tata_cliq", 28000.0),
        ("myntra", 29000.0),
    ] {
        seed_price(&state.db, &product.id, store, price).await;
    }
    for bank in ["HDFC", "ICICI", "SBI", "Axis"] {
        seed_bank_offer(&state.db, bank, FUTURE, true).await;
    }
    seed_bank_offer(&state.db, "Expired Bank", PAST, true).await;

    let user = seed_user(&state.db, "shopper@example.com").await;

    let (status, body) = send(
        &app,
        test_request(
            "POST",
            "/api/extension/detect",
            Some(json!({
                "productTitle": "sony wh-1000xm5",
                "userId": user.id,
                "currentUrl": "https://www.flipkart.com/sony-wh-1000xm5/p/itm123",
            })),
            &[("x-extension-id", "ext-42")],
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["found"], true);
    assert_eq!(body["product"]["id"], product.id.as_str());
    assert_eq!(body["bestPrice"], 25500.0);

    let alternatives: Vec<f64> = body["alternatives"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["price"].as_f64().unwrap())
        .collect();
    assert_eq!(alternatives, vec![26000.0, 26500.0, 27000.0]);

    let bank_offers = body["bankOffers"].as_array().unwrap();
    assert_eq!(bank_offers.len(), 3);
    assert!(bank_offers.iter().all(|o| o["bankName"] != "Expired Bank"));
    assert_eq!(body["priceDropAlert"]["enabled"], false);

    let (event_type, store_name): (String, Option<String>) =
        sqlx::query_as("SELECT event_type, store_name FROM extension_events WHERE user_id = ?")
            .bind(&user.id)
            .fetch_one(&state.db)
            .await
            .unwrap();
    assert_eq!(event_type, "comparison_viewed");
    assert_eq!(store_name.as_deref(), Some("flipkart"));

    assert!(cache(&state).get(&keys::extension("ext-42")).await.unwrap().is_some());
}

#[tokio::test]
async fn test_detect_without_user_logs_nothing() {
    let (_dir, state) = setup_state().await;
    let app = setup_app(&state);

    seed_product(&state.db, "Kindle Paperwhite", 13999.0, 15999.0, true).await;

    let (status, body) = send(
        &app,
        test_request("POST", "/api/extension/detect", Some(json!({ "productTitle": "kindle" })), &[]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bestPrice"], 13999.0);

    let events: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM extension_events")
        .fetch_one(&state.db)
        .await
        .unwrap();
    assert_eq!(events, 0);
    assert!(cache(&state).get(&keys::extension("anonymous")).await.unwrap().is_some());
}

// =============================================================================
// Alerts
// =============================================================================

#[tokio::test]
async fn test_alerts_require_api_key() {
    let (_dir, state) = setup_state().await;
    let app = setup_app(&state);

    let (status, _) = send(&app, test_request("GET", "/api/alerts", None, &[])).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        test_request("GET", "/api/alerts", None, &[("authorization", "Bearer dh_not_a_real_key")]),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn test_create_alert_for_existing_product() {
    let (_dir, state) = setup_state().await;
    let app = setup_app(&state);

    let product = seed_product(&state.db, "Pixel 8 Pro", 99999.0, 106999.0, true).await;
    let user = seed_user(&state.db, "alerts@example.com").await;
    let auth = bearer(&user.api_key);

    let (status, body) = send(
        &app,
        test_request(
            "POST",
            "/api/alerts/create",
            Some(json!({ "productTitle": "pixel 8", "targetPrice": 90000, "alertType": "below" })),
            &[("authorization", &auth)],
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Price alert set for ₹90,000.00");

    let (status, list) = send(&app, test_request("GET", "/api/alerts", None, &[("authorization", &auth)])).await;
    assert_eq!(status, StatusCode::OK);
    let alerts = list.as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["id"], body["alertId"]);
    assert_eq!(alerts[0]["productId"], product.id.as_str());
    assert_eq!(alerts[0]["alertType"], "below");

    let cached: Option<Vec<PriceAlert>> =
        cache::load_json(cache(&state), &keys::user_alerts(&user.id)).await;
    assert_eq!(cached.map(|a| a.len()), Some(1));
}

#[tokio::test]
async fn test_create_alert_creates_placeholder_product() {
    let (_dir, state) = setup_state().await;
    let app = setup_app(&state);

    let user = seed_user(&state.db, "newbie@example.com").await;
    let auth = bearer(&user.api_key);

    let (status, body) = send(
        &app,
        test_request(
            "POST",
            "/api/alerts/create",
            Some(json!({
                "productTitle": "Boat Airdopes 141",
                "targetPrice": 1000,
                "alertType": "drop_percentage",
                "sourceUrl": "https://www.amazon.in/dp/B09N3ZNHTY",
            })),
            &[("authorization", &auth)],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let product = products::find_product_by_title(&state.db, "Boat Airdopes 141")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(product.slug, "boat-airdopes-141");
    assert_eq!(product.min_price, 1000.0);
    assert_eq!(product.max_price, 1500.0);
    assert_eq!(product.category_id, "uncategorized");
    assert!(!product.verified);

    let drop: Option<f64> = sqlx::query_scalar("SELECT drop_percentage FROM price_alerts WHERE id = ?")
        .bind(body["alertId"].as_str().unwrap())
        .fetch_one(&state.db)
        .await
        .unwrap();
    assert_eq!(drop, Some(10.0));
}

#[tokio::test]
async fn test_create_alert_rejects_bad_input() {
    let (_dir, state) = setup_state().await;
    let app = setup_app(&state);

    let user = seed_user(&state.db, "picky@example.com").await;
    let auth = bearer(&user.api_key);

    for payload in [
        json!({ "targetPrice": 100 }),
        json!({ "productTitle": "Thing", "targetPrice": -5 }),
        json!({ "productTitle": "Thing", "targetPrice": 100, "alertType": "above" }),
    ] {
        let (status, _) = send(
            &app,
            test_request("POST", "/api/alerts/create", Some(payload), &[("authorization", &auth)]),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_create_alert_missing_field_is_json_400() {
    let (_dir, state) = setup_state().await;
    let app = setup_app(&state);

    let user = seed_user(&state.db, "forgetful@example.com").await;
    let auth = bearer(&user.api_key);

    let response = app
        .clone()
        .oneshot(test_request(
            "POST",
            "/api/alerts/create",
            Some(json!({ "productTitle": "Thing" })),
            &[("authorization", &auth)],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers().get("content-type").and_then(|v| v.to_str().ok()),
        Some("application/json")
    );

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].as_str().unwrap().contains("targetPrice"));
}

#[tokio::test]
async fn test_malformed_body_counts_against_rate_limit() {
    let (_dir, state) = setup_state().await;
    let app = setup_app(&state);

    let garbage = || {
        Request::builder()
            .method("POST")
            .uri("/api/users/register")
            .header("content-type", "application/json")
            .header("x-forwarded-for", "198.51.100.7")
            .body(Body::from("{not json"))
            .unwrap()
    };

    for _ in 0..5 {
        let (status, body) = send(&app, garbage()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    let (status, body) = send(&app, garbage()).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "Rate limit exceeded");
}

#[tokio::test]
async fn test_delete_alert_only_own() {
    let (_dir, state) = setup_state().await;
    let app = setup_app(&state);

    seed_product(&state.db, "Echo Dot", 3499.0, 5499.0, true).await;
    let owner = seed_user(&state.db, "owner@example.com").await;
    let other = seed_user(&state.db, "other@example.com").await;

    let (_, created) = send(
        &app,
        test_request(
            "POST",
            "/api/alerts/create",
            Some(json!({ "productTitle": "Echo Dot", "targetPrice": 2999 })),
            &[("authorization", &bearer(&owner.api_key))],
        ),
    )
    .await;
    let uri = format!("/api/alerts/{}", created["alertId"].as_str().unwrap());

    let (status, _) = send(
        &app,
        test_request("DELETE", &uri, None, &[("authorization", &bearer(&other.api_key))]),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        test_request("DELETE", &uri, None, &[("authorization", &bearer(&owner.api_key))]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, list) = send(
        &app,
        test_request("GET", "/api/alerts", None, &[("authorization", &bearer(&owner.api_key))]),
    )
    .await;
    assert_eq!(list[0]["isActive"], false);
}

// =============================================================================
// Cron
// =============================================================================

#[tokio::test]
async fn test_cron_requires_secret() {
    let (_dir, state) = setup_state().await;
    let app = setup_app(&state);

    let (status, _) = send(&app, test_request("GET", "/api/cron/update-prices", None, &[])).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        test_request(
            "GET",
            "/api/cron/update-prices",
            None,
            &[("authorization", "Bearer wrong")],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cron_refreshes_prices_and_fires_alerts() {
    let (_dir, state) = setup_state().await;
    let app = setup_app(&state);

    let verified = seed_product(&state.db, "MacBook Air M3", 1000.0, 1200.0, true).await;
    let unverified = seed_product(&state.db, "Unknown Gadget", 500.0, 600.0, false).await;
    let user = seed_user(&state.db, "cron@example.com").await;
    let auth = bearer(&user.api_key);

    send(
        &app,
        test_request(
            "POST",
            "/api/alerts/create",
            Some(json!({ "productTitle": "MacBook Air", "targetPrice": 960 })),
            &[("authorization", &auth)],
        ),
    )
    .await;

    let (status, body) = send(
        &app,
        test_request(
            "GET",
            "/api/cron/update-prices",
            None,
            &[("authorization", &bearer(CRON_SECRET))],
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["timestamp"].is_string());
    assert_eq!(body["prices"], json!({ "successful": 1, "failed": 0, "total": 1 }));
    assert_eq!(body["alerts"], json!({ "processed": 1, "triggered": 1, "failed": 0 }));

    // floor(1000 * 0.95)
    let refreshed = products::get_product(&state.db, &verified.id).await.unwrap().unwrap();
    assert_eq!(refreshed.min_price, 950.0);
    assert_eq!(refreshed.max_price, 950.0);
    assert_eq!(refreshed.lowest_ever_price, Some(950.0));

    let untouched = products::get_product(&state.db, &unverified.id).await.unwrap().unwrap();
    assert_eq!(untouched.min_price, 500.0);

    let (_, notifications) = send(
        &app,
        test_request("GET", "/api/notifications", None, &[("authorization", &auth)]),
    )
    .await;
    let notifications = notifications.as_array().unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0]["type"], "price_alert");
    assert_eq!(notifications[0]["title"], "Price Alert: MacBook Air M3");
    assert_eq!(notifications[0]["message"], "Price dropped to ₹950.00!");
    assert_eq!(notifications[0]["sentVia"], json!(["email", "push"]));

    // Alerts fire once
    let (_, second) = send(
        &app,
        test_request(
            "GET",
            "/api/cron/update-prices",
            None,
            &[("authorization", &bearer(CRON_SECRET))],
        ),
    )
    .await;
    assert_eq!(second["alerts"]["processed"], 0);
}

// =============================================================================
// Affiliate
// =============================================================================

async fn create_link(app: &axum::Router, product_id: &str, store_id: &str, url: &str) -> (StatusCode, Value) {
    send(
        app,
        test_request(
            "POST",
            "/api/admin/affiliate-links",
            Some(json!({
                "productId": product_id,
                "storeId": store_id,
                "affiliateUrl": url,
                "affiliateTag": "dealhub-21",
                "commissionRate": 4.0,
            })),
            &[("authorization", &bearer(ADMIN_SECRET))],
        ),
    )
    .await
}

#[tokio::test]
async fn test_admin_routes_require_secret() {
    let (_dir, state) = setup_state().await;
    let app = setup_app(&state);

    let (status, _) = send(
        &app,
        test_request("POST", "/api/admin/payouts", Some(json!({ "userId": "x", "amount": 1 })), &[]),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_affiliate_link_domain_validation() {
    let (_dir, state) = setup_state().await;
    let app = setup_app(&state);

    let product = seed_product(&state.db, "Mi Band 8", 3999.0, 4999.0, true).await;
    let amazon = store_id(&state.db, "amazon").await;

    let (status, body) = create_link(&app, &product.id, &amazon, "https://evil.example.com/dp/1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid affiliate URL domain");

    let (status, first) = create_link(&app, &product.id, &amazon, "https://www.amazon.in/dp/B0C1").await;
    assert_eq!(status, StatusCode::OK);

    // Same (product, store) updates in place
    let (_, second) = create_link(&app, &product.id, &amazon, "https://www.amazon.in/dp/B0C2").await;
    assert_eq!(second["id"], first["id"]);
    assert_eq!(second["affiliateUrl"], "https://www.amazon.in/dp/B0C2");
}

#[tokio::test]
async fn test_track_click_and_stats() {
    let (_dir, state) = setup_state().await;
    let app = setup_app(&state);

    let product = seed_product(&state.db, "JBL Flip 6", 9999.0, 12999.0, true).await;
    let flipkart = store_id(&state.db, "flipkart").await;
    let (_, link) = create_link(
        &app,
        &product.id,
        &flipkart,
        "https://www.flipkart.com/jbl-flip-6/p/itm1?pid=SPK1",
    )
    .await;
    let link_id = link["id"].as_str().unwrap().to_string();
    let user = seed_user(&state.db, "clicker@example.com").await;

    for _ in 0..2 {
        let (status, body) = send(
            &app,
            test_request(
                "POST",
                "/api/affiliate/track-click",
                Some(json!({ "affiliateLinkId": link_id, "userId": user.id })),
                &[("user-agent", "DealHubTest/1.0")],
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert!(body["clickId"].is_string());
        assert_eq!(body["trackingHash"].as_str().unwrap().len(), 64);
    }

    let saved = link_db::get_link(&state.db, &link_id).await.unwrap().unwrap();
    assert_eq!(saved.clicks, 2);

    let (status, stats) = send(
        &app,
        test_request(
            "GET",
            "/api/affiliate/stats",
            None,
            &[("authorization", &bearer(&user.api_key))],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["totalClicks"], 2);
    assert_eq!(stats["uniqueProducts"], 1);
    assert_eq!(stats["earnings"], 0.0);
}

#[tokio::test]
async fn test_track_click_unknown_link() {
    let (_dir, state) = setup_state().await;
    let app = setup_app(&state);

    let (status, _) = send(
        &app,
        test_request(
            "POST",
            "/api/affiliate/track-click",
            Some(json!({ "affiliateLinkId": "nope" })),
            &[],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_track_click_inactive_link() {
    let (_dir, state) = setup_state().await;
    let app = setup_app(&state);

    let product = seed_product(&state.db, "Noise ColorFit Pro 5", 3999.0, 4999.0, true).await;
    let amazon = store_id(&state.db, "amazon").await;
    let (_, link) = create_link(&app, &product.id, &amazon, "https://www.amazon.in/dp/B0CNF").await;
    let link_id = link["id"].as_str().unwrap().to_string();

    sqlx::query("UPDATE affiliate_links SET active = 0 WHERE id = ?")
        .bind(&link_id)
        .execute(&state.db)
        .await
        .unwrap();

    let (status, _) = send(
        &app,
        test_request(
            "POST",
            "/api/affiliate/track-click",
            Some(json!({ "affiliateLinkId": link_id })),
            &[],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let logged: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM click_logs WHERE affiliate_link_id = ?")
        .bind(&link_id)
        .fetch_one(&state.db)
        .await
        .unwrap();
    assert_eq!(logged, 0);
}

#[tokio::test]
async fn test_redirect_tags_url_and_counts_click() {
    let (_dir, state) = setup_state().await;
    let app = setup_app(&state);

    let product = seed_product(&state.db, "Fire TV Stick", 2999.0, 4999.0, true).await;
    let amazon = store_id(&state.db, "amazon").await;
    let (_, link) = create_link(&app, &product.id, &amazon, "https://www.amazon.in/dp/B08XY").await;
    let link_id = link["id"].as_str().unwrap().to_string();

    let response = {
        app.clone()
            .oneshot(test_request("GET", &format!("/api/affiliate/redirect/{}", link_id), None, &[]))
            .await
            .unwrap()
    };

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers()["location"],
        "https://www.amazon.in/dp/B08XY?tag=dealhub-21"
    );

    let saved = link_db::get_link(&state.db, &link_id).await.unwrap().unwrap();
    assert_eq!(saved.clicks, 1);

    let user_id: String = sqlx::query_scalar("SELECT user_id FROM click_logs WHERE affiliate_link_id = ?")
        .bind(&link_id)
        .fetch_one(&state.db)
        .await
        .unwrap();
    assert_eq!(user_id, "anonymous");
}

#[tokio::test]
async fn test_commission_and_payouts() {
    let (_dir, state) = setup_state().await;
    let app = setup_app(&state);

    let product = seed_product(&state.db, "Instant Pot Duo", 8000.0, 9000.0, true).await;
    let amazon = store_id(&state.db, "amazon").await;
    let (_, link) = create_link(&app, &product.id, &amazon, "https://www.amazon.in/dp/B07W").await;

    let (status, body) = send(
        &app,
        test_request(
            "GET",
            &format!("/api/admin/affiliate-links/{}/commission", link["id"].as_str().unwrap()),
            None,
            &[("authorization", &bearer(ADMIN_SECRET))],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    // No price records yet: 8000 * 4%
    assert_eq!(body["commission"], 320.0);

    let user = seed_user(&state.db, "earner@example.com").await;
    set_balance(&state.db, &user.id, 500.0).await;

    let payout = |amount: f64| {
        test_request(
            "POST",
            "/api/admin/payouts",
            Some(json!({ "userId": user.id, "amount": amount })),
            &[("authorization", &bearer(ADMIN_SECRET))],
        )
    };

    let (status, body) = send(&app, payout(600.0)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Insufficient balance");

    let (status, _) = send(&app, payout(0.0)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, payout(200.0)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payout"]["affiliateBalance"], 300.0);
    assert_eq!(body["payout"]["affiliatePaid"], 200.0);
}

// =============================================================================
// Offers
// =============================================================================

#[tokio::test]
async fn test_bank_offers_only_active() {
    let (_dir, state) = setup_state().await;
    let app = setup_app(&state);

    seed_bank_offer(&state.db, "HDFC", FUTURE, true).await;
    seed_bank_offer(&state.db, "Kotak", FUTURE, false).await;
    seed_bank_offer(&state.db, "Yes Bank", PAST, true).await;

    let (status, body) = send(&app, test_request("GET", "/api/offers/bank", None, &[])).await;

    assert_eq!(status, StatusCode::OK);
    let offers = body.as_array().unwrap();
    assert_eq!(offers.len(), 1);
    assert_eq!(offers[0]["bankName"], "HDFC");
    assert!(cache(&state).get(&keys::bank_offers()).await.unwrap().is_some());
}

#[tokio::test]
async fn test_store_offers() {
    let (_dir, state) = setup_state().await;
    let app = setup_app(&state);

    seed_offer(&state.db, None, "myntra", "Flat 50% off", FUTURE).await;
    seed_offer(&state.db, None, "myntra", "Old sale", PAST).await;

    let (status, body) = send(&app, test_request("GET", "/api/stores/myntra/offers", None, &[])).await;
    assert_eq!(status, StatusCode::OK);
    let offers = body.as_array().unwrap();
    assert_eq!(offers.len(), 1);
    assert_eq!(offers[0]["title"], "Flat 50% off");

    let (status, _) = send(&app, test_request("GET", "/api/stores/nowhere/offers", None, &[])).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_stores_returns_seeded_retailers() {
    let (_dir, state) = setup_state().await;
    let app = setup_app(&state);

    let (status, body) = send(&app, test_request("GET", "/api/stores", None, &[])).await;

    assert_eq!(status, StatusCode::OK);
    let stores = body.as_array().unwrap();
    assert_eq!(stores.len(), dealhub_common::retailers::RETAILERS.len());
    assert_eq!(stores[0]["displayName"], "AJIO");
}

// =============================================================================
// Registration
// =============================================================================

#[tokio::test]
async fn test_register_user() {
    let (_dir, state) = setup_state().await;
    let app = setup_app(&state);

    let register = |email: &str| {
        test_request(
            "POST",
            "/api/users/register",
            Some(json!({ "email": email, "name": "Asha" })),
            &[],
        )
    };

    let (status, body) = send(&app, register("Asha@Example.com")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["apiKey"].as_str().unwrap().starts_with("dh_"));
    assert!(body["affiliateId"].as_str().unwrap().starts_with("aff_"));

    // The new key authenticates
    let auth = bearer(body["apiKey"].as_str().unwrap());
    let (status, _) = send(&app, test_request("GET", "/api/alerts", None, &[("authorization", &auth)])).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, register("asha@example.com")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Email already registered");

    let (status, _) = send(&app, register("not-an-email")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
