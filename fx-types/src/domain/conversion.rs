//! Conversion result and rounding rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::currency::CurrencyCode;

/// Decimal places kept for exchange rates.
pub const RATE_DECIMALS: u32 = 6;

/// Decimal places kept for converted amounts.
pub const AMOUNT_DECIMALS: u32 = 2;

/// Above 2^53 every `f64` is already a whole number.
const EXACT_INTEGER_LIMIT: f64 = 9_007_199_254_740_992.0;

/// Rounds half away from zero to `decimals` places.
///
/// Values too large to carry a fractional part are returned unchanged, so a
/// finite input never rounds to infinity.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() || value.abs() >= EXACT_INTEGER_LIMIT {
        return value;
    }
    let factor = 10f64.powi(decimals as i32);
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / factor
}

/// Outcome of a pairwise conversion.
///
/// `rate == round(rate_of(to) / rate_of(from), 6)` and
/// `result == round(amount * rate, 2)`, both taken from the snapshot
/// whose `fetched_at` is reported as `as_of`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ConversionResult {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    #[schema(example = 100.0)]
    pub amount: f64,
    #[schema(example = 85.0)]
    pub result: f64,
    #[schema(example = 0.85)]
    pub rate: f64,
    #[schema(value_type = String, example = "2024-01-01T00:00:00Z")]
    pub as_of: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to_six_places() {
        assert_eq!(round_to(1.0 / 0.85, RATE_DECIMALS), 1.176471);
        assert_eq!(round_to(0.73 / 0.85, RATE_DECIMALS), 0.858824);
    }

    #[test]
    fn test_round_to_two_places() {
        assert_eq!(round_to(85.004, AMOUNT_DECIMALS), 85.0);
        assert_eq!(round_to(-12.345678, AMOUNT_DECIMALS), -12.35);
    }

    #[test]
    fn test_round_to_huge_values_stay_finite() {
        assert_eq!(round_to(1e307, AMOUNT_DECIMALS), 1e307);
        assert_eq!(round_to(-1.7e308, RATE_DECIMALS), -1.7e308);
        assert_eq!(round_to(1e20, AMOUNT_DECIMALS), 1e20);
        assert!(round_to(f64::MAX, RATE_DECIMALS).is_finite());
    }
}
