//! Affiliate link composition, validation and click tracking hashes

use sha2::{Digest, Sha256};
use url::Url;

use crate::retailers::retailer_for_host;

/// Append the affiliate tag to a retailer URL
///
/// Amazon and Flipkart use their own tag parameters; every other retailer
/// receives a generic `affiliate` query parameter.
pub fn generate_affiliate_link(base_url: &str, affiliate_tag: &str) -> String {
    if base_url.contains("amazon.in") {
        return format!("{}?tag={}", base_url, affiliate_tag);
    }

    if base_url.contains("flipkart.com") {
        return format!("{}&affid={}", base_url, affiliate_tag);
    }

    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!("{}{}affiliate={}", base_url, separator, affiliate_tag)
}

/// Accept only URLs pointing at a whitelisted retailer
pub fn is_valid_affiliate_url(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(|h| retailer_for_host(h).is_some()))
        .unwrap_or(false)
}

/// Hex SHA-256 over `link:user:timestamp`, returned to clients with each tracked click
pub fn generate_tracking_hash(affiliate_link_id: &str, user_id: &str, timestamp_ms: i64) -> String {
    let data = format!("{}:{}:{}", affiliate_link_id, user_id, timestamp_ms);
    format!("{:x}", Sha256::digest(data.as_bytes()))
}
