//! HTTP API handlers for dealhub-api

pub mod admin;
pub mod affiliate;
pub mod alerts;
pub mod auth;
pub mod client;
pub mod cron;
pub mod extension;
pub mod health;
pub mod json;
pub mod offers;
pub mod products;
pub mod users;

pub use admin::{create_payout, get_commission, upsert_affiliate_link};
pub use affiliate::{affiliate_stats, redirect, track_click};
pub use alerts::{create_alert, delete_alert, list_alerts, list_notifications};
pub use auth::{require_admin_secret, require_cron_secret, AuthUser};
pub use client::ClientIp;
pub use cron::update_prices;
pub use extension::detect_product;
pub use health::{get_build_info, health_routes};
pub use json::ApiJson;
pub use offers::{bank_offers, list_stores, store_offers};
pub use products::compare_products;
pub use users::register_user;
