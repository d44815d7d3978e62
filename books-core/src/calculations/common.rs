//! Shared pieces of the calculation modules: financial rounding and the
//! input-validation error they all raise.

use rust_decimal::Decimal;
use thiserror::Error;

/// Raised before any calculation proceeds when a monetary or mileage input
/// is out of range. Callers should reject the write and re-prompt.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidAmountError {
    /// A value that must be zero or more was negative.
    #[error("{0} must not be negative, got {1}")]
    Negative(&'static str, Decimal),

    /// A payment amount that must be strictly positive was not.
    #[error("payment amount must be positive, got {0}")]
    NonPositivePayment(Decimal),
}

/// Rounds a decimal value to exactly two decimal places using half-up rounding.
///
/// Standard financial rounding: values at exactly 0.005 round up to 0.01
/// (away from zero). All monetary results in this crate are rounded exactly
/// once, at the boundary of the calculation that produces them.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use books_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(123.454)), dec!(123.45));
/// assert_eq!(round_half_up(dec!(123.455)), dec!(123.46));
/// assert_eq!(round_half_up(dec!(-123.455)), dec!(-123.46)); // Away from zero
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
}
