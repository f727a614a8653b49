//! Small formatting, validation and identifier helpers

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());
static SLUG_STRIP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9_\s-]").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static DASHES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").unwrap());

const AFFILIATE_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Turn a product title into a URL slug
pub fn slugify(text: &str) -> String {
    let lower = text.to_lowercase();
    let stripped = SLUG_STRIP_RE.replace_all(&lower, "");
    let dashed = WHITESPACE_RE.replace_all(stripped.trim(), "-");
    let collapsed = DASHES_RE.replace_all(&dashed, "-");
    collapsed.trim_matches('-').to_string()
}

pub fn validate_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Whole-number discount of `current` relative to `original`
pub fn discount_percentage(original: f64, current: f64) -> i64 {
    if original <= 0.0 {
        return 0;
    }
    (((original - current) / original) * 100.0).round() as i64
}

/// Format an amount as Indian rupees, e.g. `₹1,23,456.50`
pub fn format_inr(amount: f64) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    let paise = (amount.abs() * 100.0).round() as u64;
    format!(
        "{}₹{}.{:02}",
        sign,
        group_indian_digits(&(paise / 100).to_string()),
        paise % 100
    )
}

/// Lakh/crore grouping: last three digits, then pairs
fn group_indian_digits(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups = Vec::new();
    let mut end = head.len();
    while end > 2 {
        groups.push(&head[end - 2..end]);
        end -= 2;
    }
    groups.push(&head[..end]);
    groups.reverse();

    format!("{},{}", groups.join(","), tail)
}

/// Parse a price as displayed on a retailer page (`₹1,299.`, `Rs. 499`)
pub fn parse_price_text(text: &str) -> Option<f64> {
    let cleaned: String = text
        .replace('₹', "")
        .replace("Rs.", "")
        .replace("INR", "")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .collect();
    let cleaned = cleaned.trim_end_matches('.');

    if cleaned.is_empty() {
        return None;
    }

    cleaned
        .parse::<f64>()
        .ok()
        .filter(|price| price.is_finite() && *price >= 0.0)
}

/// New API key for a registered user (`dh_` + 32 URL-safe characters)
pub fn generate_api_key() -> String {
    let bytes: [u8; 24] = rand::thread_rng().gen();
    format!("dh_{}", URL_SAFE_NO_PAD.encode(bytes))
}

/// New public affiliate identifier (`aff_` + 9 characters)
pub fn generate_affiliate_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| AFFILIATE_ID_ALPHABET[rng.gen_range(0..AFFILIATE_ID_ALPHABET.len())] as char)
        .collect();
    format!("aff_{}", suffix)
}
