//! Monetary amount helpers.
//!
//! All monetary amounts in the system are fixed-point decimals with 4
//! fractional digits. Arithmetic uses exact decimal math, never floats,
//! so matched debit/credit pairs can never drift apart by rounding.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::AppError;

/// Number of fractional digits carried by every monetary amount.
pub const MONEY_SCALE: u32 = 4;

/// Validate an amount used in a balance mutation or transaction.
///
/// # Errors
///
/// - `Validation` if the amount is zero or negative
/// - `Validation` if the amount carries more than 4 decimal places
pub fn validate_amount(amount: Decimal) -> Result<(), AppError> {
    if amount <= Decimal::ZERO {
        return Err(AppError::Validation("Amount must be positive".to_string()));
    }
    if amount.normalize().scale() > MONEY_SCALE {
        return Err(AppError::Validation(format!(
            "Amount must have at most {MONEY_SCALE} decimal places"
        )));
    }
    Ok(())
}

/// Round a computed amount (e.g. a percentage fee) to money scale.
///
/// Midpoints round away from zero: a fee of 0.00005 becomes 0.0001.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rejects_zero_and_negative_amounts() {
        assert!(validate_amount(Decimal::ZERO).is_err());
        assert!(validate_amount(dec!(-1)).is_err());
        assert!(validate_amount(dec!(0.0001)).is_ok());
    }

    #[test]
    fn rejects_amounts_finer_than_scale_4() {
        assert!(validate_amount(dec!(1.00001)).is_err());
        assert!(validate_amount(dec!(1.0001)).is_ok());
        // Trailing zeros beyond scale 4 are not real precision.
        assert!(validate_amount(dec!(1.000100)).is_ok());
    }

    #[test]
    fn rounds_midpoints_away_from_zero() {
        assert_eq!(round_money(dec!(0.00005)), dec!(0.0001));
        assert_eq!(round_money(dec!(5.250000)), dec!(5.2500));
        assert_eq!(round_money(dec!(0.123449)), dec!(0.1234));
    }
}
