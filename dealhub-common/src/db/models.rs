//! Database models
//!
//! Rows are decoded by hand from `SqliteRow` so column names stay visible at
//! the call site. Identifiers are UUID strings and timestamps RFC 3339 strings.

use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Condition under which a price alert fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    /// Latest price at or below the target price
    Below,
    /// Latest price at least `drop_percentage` percent under the product's max price
    DropPercentage,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Below => "below",
            AlertType::DropPercentage => "drop_percentage",
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "below" => Ok(AlertType::Below),
            "drop_percentage" => Ok(AlertType::DropPercentage),
            other => Err(Error::InvalidInput(format!("Unknown alert type: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: String,
    pub affiliate_id: String,
    pub affiliate_balance: f64,
    pub affiliate_paid: f64,
    pub created_at: String,
}

impl User {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            name: row.try_get("name")?,
            api_key: row.try_get("api_key")?,
            affiliate_id: row.try_get("affiliate_id")?,
            affiliate_balance: row.try_get("affiliate_balance")?,
            affiliate_paid: row.try_get("affiliate_paid")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub logo: Option<String>,
    pub website: Option<String>,
}

impl Store {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            display_name: row.try_get("display_name")?,
            logo: row.try_get("logo")?,
            website: row.try_get("website")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub brand: Option<String>,
    pub category_id: String,
    pub product_type: String,
    pub rating: Option<f64>,
    pub review_count: i64,
    pub min_price: f64,
    pub max_price: f64,
    pub lowest_ever_price: Option<f64>,
    pub verified: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Product {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            slug: row.try_get("slug")?,
            description: row.try_get("description")?,
            image_url: row.try_get("image_url")?,
            brand: row.try_get("brand")?,
            category_id: row.try_get("category_id")?,
            product_type: row.try_get("product_type")?,
            rating: row.try_get("rating")?,
            review_count: row.try_get("review_count")?,
            min_price: row.try_get("min_price")?,
            max_price: row.try_get("max_price")?,
            lowest_ever_price: row.try_get("lowest_ever_price")?,
            verified: row.try_get("verified")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// A timestamped price observation for a product at one store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PriceRecord {
    pub id: String,
    pub product_id: String,
    pub store_id: String,
    pub price: f64,
    pub original_price: Option<f64>,
    pub discount: Option<f64>,
    pub in_stock: bool,
    pub url: String,
    pub recorded_at: String,
}

impl PriceRecord {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            product_id: row.try_get("product_id")?,
            store_id: row.try_get("store_id")?,
            price: row.try_get("price")?,
            original_price: row.try_get("original_price")?,
            discount: row.try_get("discount")?,
            in_stock: row.try_get("in_stock")?,
            url: row.try_get("url")?,
            recorded_at: row.try_get("recorded_at")?,
        })
    }
}

/// Store-specific promotion, optionally tied to one product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub id: String,
    pub product_id: Option<String>,
    pub store_id: String,
    pub title: String,
    pub description: Option<String>,
    pub valid_till: String,
    pub active: bool,
}

impl Offer {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            product_id: row.try_get("product_id")?,
            store_id: row.try_get("store_id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            valid_till: row.try_get("valid_till")?,
            active: row.try_get("active")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BankOffer {
    pub id: String,
    pub bank_name: String,
    pub title: String,
    pub description: Option<String>,
    pub discount_percent: Option<f64>,
    pub max_discount: Option<f64>,
    pub min_order_value: Option<f64>,
    pub valid_till: String,
    pub active: bool,
}

impl BankOffer {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            bank_name: row.try_get("bank_name")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            discount_percent: row.try_get("discount_percent")?,
            max_discount: row.try_get("max_discount")?,
            min_order_value: row.try_get("min_order_value")?,
            valid_till: row.try_get("valid_till")?,
            active: row.try_get("active")?,
        })
    }
}

/// Outbound URL for a (product, store) pair carrying the commission tag
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AffiliateLink {
    pub id: String,
    pub product_id: String,
    pub store_id: String,
    pub affiliate_url: String,
    pub affiliate_tag: String,
    pub commission_rate: f64,
    pub clicks: i64,
    pub active: bool,
}

impl AffiliateLink {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            product_id: row.try_get("product_id")?,
            store_id: row.try_get("store_id")?,
            affiliate_url: row.try_get("affiliate_url")?,
            affiliate_tag: row.try_get("affiliate_tag")?,
            commission_rate: row.try_get("commission_rate")?,
            clicks: row.try_get("clicks")?,
            active: row.try_get("active")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClickLog {
    pub id: String,
    pub user_id: String,
    pub affiliate_link_id: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub clicked_at: String,
}

impl ClickLog {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            affiliate_link_id: row.try_get("affiliate_link_id")?,
            ip_address: row.try_get("ip_address")?,
            user_agent: row.try_get("user_agent")?,
            clicked_at: row.try_get("clicked_at")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PriceAlert {
    pub id: String,
    pub user_id: String,
    pub product_id: String,
    pub target_price: f64,
    pub alert_type: AlertType,
    pub drop_percentage: Option<f64>,
    pub is_active: bool,
    pub notified: bool,
    pub notification_sent_at: Option<String>,
    pub created_at: String,
}

impl PriceAlert {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        let alert_type: String = row.try_get("alert_type")?;
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            product_id: row.try_get("product_id")?,
            target_price: row.try_get("target_price")?,
            alert_type: alert_type.parse()?,
            drop_percentage: row.try_get("drop_percentage")?,
            is_active: row.try_get("is_active")?,
            notified: row.try_get("notified")?,
            notification_sent_at: row.try_get("notification_sent_at")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    /// Delivery channels, e.g. `email`, `push`
    pub sent_via: Vec<String>,
    pub is_read: bool,
    pub created_at: String,
}

impl Notification {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        let sent_via: String = row.try_get("sent_via")?;
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            kind: row.try_get("kind")?,
            title: row.try_get("title")?,
            message: row.try_get("message")?,
            link: row.try_get("link")?,
            sent_via: serde_json::from_str(&sent_via)
                .map_err(|e| Error::Internal(format!("Corrupt sent_via column: {}", e)))?,
            is_read: row.try_get("is_read")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionEvent {
    pub id: String,
    pub user_id: String,
    pub event_type: String,
    pub product_url: Option<String>,
    pub product_title: Option<String>,
    pub store_name: Option<String>,
    pub created_at: String,
}

impl ExtensionEvent {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            event_type: row.try_get("event_type")?,
            product_url: row.try_get("product_url")?,
            product_title: row.try_get("product_title")?,
            store_name: row.try_get("store_name")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_type_parse_and_display() {
        assert_eq!("below".parse::<AlertType>().unwrap(), AlertType::Below);
        assert_eq!(
            "drop_percentage".parse::<AlertType>().unwrap(),
            AlertType::DropPercentage
        );
        assert!("above".parse::<AlertType>().is_err());
        assert_eq!(AlertType::DropPercentage.to_string(), "drop_percentage");
    }

    #[test]
    fn test_alert_type_serde_matches_column_values() {
        assert_eq!(serde_json::to_string(&AlertType::Below).unwrap(), "\"below\"");
        let parsed: AlertType = serde_json::from_str("\"drop_percentage\"").unwrap();
        assert_eq!(parsed, AlertType::DropPercentage);
    }

    #[test]
    fn test_notification_serializes_kind_as_type() {
        let n = Notification {
            id: "n1".to_string(),
            user_id: "u1".to_string(),
            kind: "price_alert".to_string(),
            title: "Price Alert: Pixel 9".to_string(),
            message: "Price dropped to ₹59,999.00!".to_string(),
            link: Some("/products/pixel-9".to_string()),
            sent_via: vec!["email".to_string(), "push".to_string()],
            is_read: false,
            created_at: "2025-01-01T00:00:00.000Z".to_string(),
        };
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["type"], "price_alert");
        assert_eq!(json["sentVia"][1], "push");
    }
}
