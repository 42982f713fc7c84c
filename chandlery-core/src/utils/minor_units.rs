//! Decimal-to-minor-currency-unit conversion for the card provider.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

/// Errors produced when converting a decimal amount to minor units.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MinorUnitError {
    #[error("amount {0} is negative")]
    Negative(Decimal),
    #[error("amount {0} does not fit in 64-bit minor units")]
    Overflow(Decimal),
}

/// Convert a decimal major-currency amount to integer minor units
/// (cents), rounding half-up at the second decimal place.
///
/// `19.995` rounds to `2000`, not `1999`.
pub fn to_minor_units(amount: Decimal) -> Result<i64, MinorUnitError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(MinorUnitError::Negative(amount));
    }
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    (rounded * Decimal::ONE_HUNDRED)
        .to_i64()
        .ok_or(MinorUnitError::Overflow(amount))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_amounts_scale_by_one_hundred() {
        assert_eq!(to_minor_units(Decimal::new(2550, 2)), Ok(2550));
        assert_eq!(to_minor_units(Decimal::from(10)), Ok(1000));
        assert_eq!(to_minor_units(Decimal::ZERO), Ok(0));
    }

    #[test]
    fn fractional_cents_round_half_up() {
        // 19.995 -> 20.00 -> 2000
        assert_eq!(to_minor_units(Decimal::new(19_995, 3)), Ok(2000));
        // 19.994 -> 19.99 -> 1999
        assert_eq!(to_minor_units(Decimal::new(19_994, 3)), Ok(1999));
        // 0.005 -> 0.01 -> 1
        assert_eq!(to_minor_units(Decimal::new(5, 3)), Ok(1));
    }

    #[test]
    fn negative_amounts_are_rejected() {
        assert_eq!(
            to_minor_units(Decimal::new(-100, 2)),
            Err(MinorUnitError::Negative(Decimal::new(-100, 2)))
        );
    }
}
