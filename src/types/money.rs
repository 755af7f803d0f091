//! Fixed-point money handling
//!
//! All balances and amounts are `rust_decimal::Decimal` values carrying exactly
//! [`SCALE`] fractional digits. Floating point never touches balance math.

use super::error::LedgerError;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Number of fractional digits carried by every amount and balance
pub const SCALE: u32 = 2;

/// Validate a posting amount and normalise it to [`SCALE`] digits
///
/// Trailing zeros are ignored, so `10.500` is accepted as `10.50`, while
/// `10.505` is rejected.
///
/// # Errors
///
/// Returns `InvalidAmount` if the amount is zero, negative, needs more than
/// [`SCALE`] fractional digits, or is too large to carry [`SCALE`] digits.
pub fn validate_amount(amount: Decimal) -> Result<Decimal, LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::invalid_amount(amount, "must be positive"));
    }
    if amount.normalize().scale() > SCALE {
        return Err(LedgerError::invalid_amount(
            amount,
            "more than 2 fractional digits",
        ));
    }

    // rescale keeps a smaller scale when the mantissa would overflow
    let mut scaled = amount;
    scaled.rescale(SCALE);
    if scaled.scale() != SCALE {
        return Err(LedgerError::invalid_amount(
            amount,
            "too large for 2 fractional digits",
        ));
    }
    Ok(scaled)
}

/// Parse a textual amount and validate it
///
/// # Errors
///
/// Returns `InvalidAmount` if the text is not a decimal number or fails
/// [`validate_amount`].
pub fn parse_amount(text: &str) -> Result<Decimal, LedgerError> {
    let amount = Decimal::from_str(text.trim()).map_err(|_| LedgerError::InvalidAmount {
        amount: text.to_string(),
        reason: "not a decimal number".to_string(),
    })?;
    validate_amount(amount)
}
