//! Supported retailers
//!
//! One table drives store seeding, affiliate URL whitelisting and store
//! detection from product page URLs.

use url::Url;

/// A retailer DealHub tracks prices for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retailer {
    /// Canonical store name, used as the `stores.name` key
    pub name: &'static str,
    pub display_name: &'static str,
    /// Host suffix identifying the retailer's site
    pub domain: &'static str,
}

pub const RETAILERS: &[Retailer] = &[
    Retailer { name: "amazon", display_name: "Amazon", domain: "amazon.in" },
    Retailer { name: "flipkart", display_name: "Flipkart", domain: "flipkart.com" },
    Retailer { name: "myntra", display_name: "Myntra", domain: "myntra.com" },
    Retailer { name: "ajio", display_name: "AJIO", domain: "ajio.com" },
    Retailer { name: "meesho", display_name: "Meesho", domain: "meesho.com" },
    Retailer { name: "tata_cliq", display_name: "Tata CLiQ", domain: "tataccliq.com" },
    Retailer { name: "croma", display_name: "Croma", domain: "croma.com" },
    Retailer { name: "nykaa", display_name: "Nykaa", domain: "nykaa.com" },
    Retailer { name: "firstcry", display_name: "FirstCry", domain: "firstcry.com" },
    Retailer { name: "reliance", display_name: "Reliance Digital", domain: "reliance.com" },
];

/// Find the retailer whose domain appears in `host`
pub fn retailer_for_host(host: &str) -> Option<&'static Retailer> {
    let host = host.to_ascii_lowercase();
    RETAILERS.iter().find(|r| host.contains(r.domain))
}

/// Detect the store name from a product page URL
pub fn detect_store(page_url: &str) -> Option<&'static str> {
    let parsed = Url::parse(page_url).ok()?;
    let host = parsed.host_str()?;
    retailer_for_host(host).map(|r| r.name)
}
