//! Database queries for dealhub-api
//!
//! One module per entity. Schema creation lives in `dealhub_common::db`.

pub mod affiliate;
pub mod alerts;
pub mod events;
pub mod notifications;
pub mod offers;
pub mod prices;
pub mod products;
pub mod stores;
pub mod users;

/// Escape `%`, `_` and `\` for use inside a `LIKE ... ESCAPE '\'` pattern
pub(crate) fn like_escape(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_escape() {
        assert_eq!(like_escape("iphone 15"), "iphone 15");
        assert_eq!(like_escape("50% off_now\\"), "50\\% off\\_now\\\\");
    }
}
