// Input validation for book fields
// Parse failures and out-of-range values come back as None, never as errors

use chrono::{Datelike, Local};

pub const MIN_YEAR: i32 = 1000;

// User-facing rejection messages, shared by the store and the HTTP layer
pub const MSG_TITLE_AUTHOR_REQUIRED: &str = "Título e autor são obrigatórios.";
pub const MSG_INVALID_YEAR: &str = "Ano inválido.";
pub const MSG_INVALID_PRICE: &str = "Preço inválido.";

/// Validate a publication year against the local clock
pub fn validate_year(input: &str) -> Option<i32> {
    validate_year_at(input, Local::now().year())
}

/// Validate a publication year; accepts 1000..=current_year+1
pub fn validate_year_at(input: &str, current_year: i32) -> Option<i32> {
    let year: i32 = input.trim().parse().ok()?;
    if year_in_range_at(year, current_year) {
        Some(year)
    } else {
        None
    }
}

/// Validate a price: any finite number >= 0
pub fn validate_price(input: &str) -> Option<f64> {
    let price: f64 = input.trim().parse().ok()?;
    if price_is_valid(price) {
        Some(price)
    } else {
        None
    }
}

/// Range check for an already-typed year
pub fn year_in_range(year: i32) -> bool {
    year_in_range_at(year, Local::now().year())
}

fn year_in_range_at(year: i32, current_year: i32) -> bool {
    (MIN_YEAR..=current_year + 1).contains(&year)
}

/// Range check for an already-typed price (NaN and infinities rejected)
pub fn price_is_valid(price: f64) -> bool {
    price.is_finite() && price >= 0.0
}
