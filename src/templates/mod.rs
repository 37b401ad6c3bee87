//! Server-rendered pages (maud).

pub mod error;
pub mod layout;
pub mod listings;
pub mod session;

use crate::{auth::AuthUser, flash::FlashMessage};

pub use layout::page;

/// Frame
///
/// Per-request chrome shared by every page: the navbar needs the caller and
/// the banner needs the pending flash message.
#[derive(Clone, Copy, Default)]
pub struct Frame<'a> {
    pub current_user: Option<&'a AuthUser>,
    pub flash: Option<&'a FlashMessage>,
}

/// Formats a price with comma thousands separators (`1250000` → `1,250,000`).
pub fn format_price(price: i64) -> String {
    let digits = price.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if price < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::format_price;

    #[test]
    fn groups_thousands() {
        assert_eq!(format_price(0), "0");
        assert_eq!(format_price(999), "999");
        assert_eq!(format_price(1000), "1,000");
        assert_eq!(format_price(1250000), "1,250,000");
    }
}
