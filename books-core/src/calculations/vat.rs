//! VAT back-calculation for VAT-inclusive (gross) prices.
//!
//! UK trade prices are quoted gross, with VAT already inside the figure, so
//! the VAT portion is `gross × rate / (100 + rate)` — not the naive
//! `gross × rate`, which would compute VAT on top of an ex-VAT price.

use rust_decimal::Decimal;

use crate::calculations::common::{InvalidAmountError, round_half_up};

/// The UK standard VAT rate, as a percentage.
pub const STANDARD_VAT_RATE_PERCENT: Decimal = Decimal::from_parts(20, 0, 0, false, 0);

/// The VAT portion contained in a gross (VAT-inclusive) amount.
///
/// Rounded once, to the penny. [`net_from_gross`] is defined as the
/// remainder, so `net + vat == gross` holds exactly.
///
/// # Errors
///
/// Returns [`InvalidAmountError`] when `gross` or `rate_percent` is
/// negative.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use books_core::calculations::vat::{STANDARD_VAT_RATE_PERCENT, vat_from_gross};
///
/// assert_eq!(vat_from_gross(dec!(120.00), STANDARD_VAT_RATE_PERCENT), Ok(dec!(20.00)));
/// assert_eq!(vat_from_gross(dec!(50.00), STANDARD_VAT_RATE_PERCENT), Ok(dec!(8.33)));
/// ```
pub fn vat_from_gross(gross: Decimal, rate_percent: Decimal) -> Result<Decimal, InvalidAmountError> {
    if gross < Decimal::ZERO {
        return Err(InvalidAmountError::Negative("gross amount", gross));
    }
    if rate_percent < Decimal::ZERO {
        return Err(InvalidAmountError::Negative("VAT rate", rate_percent));
    }

    Ok(round_half_up(
        gross * rate_percent / (Decimal::ONE_HUNDRED + rate_percent),
    ))
}

/// The net (ex-VAT) portion of a gross amount: the gross minus the rounded
/// VAT figure, so the two parts always re-add to the gross.
///
/// # Errors
///
/// Returns [`InvalidAmountError`] when `gross` or `rate_percent` is
/// negative.
pub fn net_from_gross(gross: Decimal, rate_percent: Decimal) -> Result<Decimal, InvalidAmountError> {
    Ok(gross - vat_from_gross(gross, rate_percent)?)
}
