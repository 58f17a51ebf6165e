//! Rate validation and the conversion engine.
//!
//! An edge `base -> target = r` means 1 unit of `base` equals `r` units of
//! `target`. Every stored edge is paired with its reciprocal, so the rules
//! here are shared by the repository that writes the pairs.

use rust_decimal::Decimal;
use thiserror::Error;

/// Violations of the rate-pair rules.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RateError {
    /// Base and target must be different currencies.
    #[error("base and target must be different")]
    SameCurrency,

    /// Rates are strictly positive; zero has no reciprocal.
    #[error("rate must be positive")]
    NonPositiveRate,
}

/// Validates a rate edge before it is written.
///
/// # Errors
///
/// Returns `RateError::SameCurrency` when `base == target` (the self edge is
/// fixed at 1 and never written through this path) and
/// `RateError::NonPositiveRate` when `rate <= 0`.
pub fn validate_pair(base: &str, target: &str, rate: Decimal) -> Result<(), RateError> {
    if base == target {
        return Err(RateError::SameCurrency);
    }
    if rate <= Decimal::ZERO {
        return Err(RateError::NonPositiveRate);
    }
    Ok(())
}

/// Returns the reciprocal edge value, `1 / rate`.
#[must_use]
pub fn reciprocal(rate: Decimal) -> Decimal {
    Decimal::ONE / rate
}

/// Converts an amount over a direct edge: `amount * rate`.
///
/// No rounding is applied; callers see the full product.
#[must_use]
pub fn convert_amount(amount: Decimal, rate: Decimal) -> Decimal {
    amount * rate
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn convert_multiplies() {
        // 100 USD at 0.9 = 90 EUR
        assert_eq!(convert_amount(dec!(100), dec!(0.9)), dec!(90));
    }

    #[test]
    fn reciprocal_matches_decimal_division() {
        assert_eq!(reciprocal(dec!(0.9)), Decimal::ONE / dec!(0.9));
        assert_eq!(reciprocal(dec!(2)), dec!(0.5));
        assert_eq!(reciprocal(dec!(1)), dec!(1));
    }

    #[test]
    fn self_edge_is_rejected() {
        assert_eq!(
            validate_pair("USD", "USD", dec!(2)),
            Err(RateError::SameCurrency)
        );
    }

    #[test]
    fn non_positive_rates_are_rejected() {
        assert_eq!(
            validate_pair("USD", "EUR", Decimal::ZERO),
            Err(RateError::NonPositiveRate)
        );
        assert_eq!(
            validate_pair("USD", "EUR", dec!(-1.5)),
            Err(RateError::NonPositiveRate)
        );
    }

    #[test]
    fn valid_pairs_pass() {
        assert_eq!(validate_pair("USD", "EUR", dec!(0.9)), Ok(()));
        // Symbols are case-sensitive opaque strings.
        assert_eq!(validate_pair("usd", "USD", dec!(1)), Ok(()));
    }
}
