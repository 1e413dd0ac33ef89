use bigdecimal::{BigDecimal, ToPrimitive};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum MoneyError {
    #[error("amount '{0}' is not a finite number")]
    NotFinite(String),
    #[error("amount {0} must be greater than zero")]
    NotPositive(f64),
    #[error("amount {0} does not fit in minor units")]
    Overflow(f64),
}

/// Normalize a monetary value to 2 decimal places, rounding half away from zero.
pub fn normalize_scale(value: &BigDecimal) -> BigDecimal {
    let half_cent = BigDecimal::new(5.into(), 3);
    let nudged = if value < &BigDecimal::from(0) {
        value.clone() - half_cent
    } else {
        value.clone() + half_cent
    };
    // with_scale truncates toward zero, so the nudge above turns it into half-up.
    nudged.with_scale(2)
}

/// Decimal form of a JSON/BSON price. Uses the shortest round-trip rendering
/// so `19.99` stays `19.99` instead of its binary expansion.
pub fn from_f64(value: f64) -> Result<BigDecimal, MoneyError> {
    if !value.is_finite() {
        return Err(MoneyError::NotFinite(value.to_string()));
    }
    BigDecimal::from_str(&value.to_string()).map_err(|_| MoneyError::NotFinite(value.to_string()))
}

/// Convert a major-unit price (dollars) to the integer minor units (cents)
/// a card processor expects. Rejects zero and negative amounts.
pub fn to_minor_units(price: f64) -> Result<i64, MoneyError> {
    let decimal = normalize_scale(&from_f64(price)?);
    if decimal <= BigDecimal::from(0) {
        return Err(MoneyError::NotPositive(price));
    }
    (decimal * BigDecimal::from(100))
        .with_scale(0)
        .to_i64()
        .ok_or(MoneyError::Overflow(price))
}

/// Round a floating total to whole cents. Non-finite input collapses to zero.
pub fn round_cents(value: f64) -> f64 {
    from_f64(value)
        .ok()
        .map(|decimal| to_f64_exact(&normalize_scale(&decimal)))
        .unwrap_or(0.0)
}

/// Sum prices exactly in decimal and return the cent-rounded total.
/// Entries that are not finite are skipped.
pub fn sum_prices<I>(prices: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let total = prices
        .into_iter()
        .filter_map(|price| from_f64(price).ok())
        .fold(BigDecimal::from(0), |acc, price| acc + price);
    to_f64_exact(&normalize_scale(&total))
}

// BigDecimal::to_f64 scales by a power of ten in binary, which can drift by an
// ulp; going through the decimal string gives the nearest double.
fn to_f64_exact(value: &BigDecimal) -> f64 {
    value.to_string().parse().unwrap_or(0.0)
}
