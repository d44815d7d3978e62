//! HMRC mileage deduction across the 10,000-mile rate threshold.
//!
//! The approved rates are 45p per mile for the cumulative first 10,000
//! miles in a fiscal year and 25p per mile beyond. A single trip can
//! straddle the threshold, in which case each segment is billed at its own
//! rate and the total is rounded once.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calculations::common::{InvalidAmountError, round_half_up};

/// Errors raised by [`MileageRates::deduction`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MileageError {
    #[error("mileage rate must not be negative, got {0}")]
    InvalidRate(Decimal),

    #[error("mileage threshold must be positive, got {0}")]
    InvalidThreshold(Decimal),

    #[error(transparent)]
    InvalidAmount(#[from] InvalidAmountError),
}

/// Per-mile rate schedule. [`Default`] gives the HMRC approved rates
/// (45p / 25p, threshold 10,000 miles).
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use books_core::calculations::MileageRates;
///
/// let rates = MileageRates::default();
///
/// // A 500-mile trip with 9,800 miles already logged this year straddles
/// // the threshold: 200 × 0.45 + 300 × 0.25.
/// assert_eq!(rates.deduction(dec!(500), dec!(9800)), Ok(dec!(165.00)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MileageRates {
    /// Rate per mile below the cumulative threshold.
    pub high_rate: Decimal,
    /// Rate per mile beyond the cumulative threshold.
    pub low_rate: Decimal,
    /// Cumulative fiscal-year mileage at which the rate drops.
    pub threshold: Decimal,
}

impl Default for MileageRates {
    fn default() -> Self {
        Self {
            high_rate: Decimal::from_parts(45, 0, 0, false, 2),
            low_rate: Decimal::from_parts(25, 0, 0, false, 2),
            threshold: Decimal::from_parts(10_000, 0, 0, false, 0),
        }
    }
}

impl MileageRates {
    /// Validates the rate schedule.
    ///
    /// # Errors
    ///
    /// Returns [`MileageError`] if either rate is negative or the threshold
    /// is not positive.
    pub fn validate(&self) -> Result<(), MileageError> {
        if self.high_rate < Decimal::ZERO {
            return Err(MileageError::InvalidRate(self.high_rate));
        }
        if self.low_rate < Decimal::ZERO {
            return Err(MileageError::InvalidRate(self.low_rate));
        }
        if self.threshold <= Decimal::ZERO {
            return Err(MileageError::InvalidThreshold(self.threshold));
        }
        Ok(())
    }

    /// Deductible amount for a trip of `trip_miles`, given the fiscal-year
    /// mileage already logged before it.
    ///
    /// The caller supplies `prior_year_miles` as the sum of all earlier
    /// trips in the same fiscal year; this function does not aggregate trip
    /// history itself.
    ///
    /// # Errors
    ///
    /// Returns [`MileageError`] if the schedule is invalid or either
    /// mileage input is negative.
    pub fn deduction(
        &self,
        trip_miles: Decimal,
        prior_year_miles: Decimal,
    ) -> Result<Decimal, MileageError> {
        self.validate()?;
        check_miles(trip_miles, prior_year_miles)?;
        Ok(self.tiered(trip_miles, prior_year_miles))
    }

    fn tiered(&self, trip_miles: Decimal, prior_year_miles: Decimal) -> Decimal {
        let deduction = if prior_year_miles >= self.threshold {
            trip_miles * self.low_rate
        } else if prior_year_miles + trip_miles <= self.threshold {
            trip_miles * self.high_rate
        } else {
            let miles_at_high_rate = self.threshold - prior_year_miles;
            let miles_at_low_rate = trip_miles - miles_at_high_rate;
            miles_at_high_rate * self.high_rate + miles_at_low_rate * self.low_rate
        };

        // One rounding at the end, not per segment.
        round_half_up(deduction)
    }
}

/// Deduction for a trip at the HMRC approved rates.
///
/// # Errors
///
/// Returns [`InvalidAmountError`] if either mileage input is negative.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use books_core::calculations::mileage_deduction;
///
/// assert_eq!(mileage_deduction(dec!(100), dec!(0)), Ok(dec!(45.00)));
/// assert_eq!(mileage_deduction(dec!(100), dec!(10000)), Ok(dec!(25.00)));
/// ```
pub fn mileage_deduction(
    trip_miles: Decimal,
    prior_year_miles: Decimal,
) -> Result<Decimal, InvalidAmountError> {
    check_miles(trip_miles, prior_year_miles)?;
    Ok(MileageRates::default().tiered(trip_miles, prior_year_miles))
}

fn check_miles(trip_miles: Decimal, prior_year_miles: Decimal) -> Result<(), InvalidAmountError> {
    if trip_miles < Decimal::ZERO {
        return Err(InvalidAmountError::Negative("trip miles", trip_miles));
    }
    if prior_year_miles < Decimal::ZERO {
        return Err(InvalidAmountError::Negative(
            "prior year miles",
            prior_year_miles,
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    // =========================================================================
    // tier selection
    // =========================================================================

    #[test]
    fn trip_entirely_below_threshold_uses_high_rate() {
        let result = mileage_deduction(dec!(100), dec!(0));

        assert_eq!(result, Ok(dec!(45.00)));
    }

    #[test]
    fn trip_entirely_above_threshold_uses_low_rate() {
        let result = mileage_deduction(dec!(100), dec!(10000));

        assert_eq!(result, Ok(dec!(25.00)));
    }

    #[test]
    fn trip_straddling_threshold_splits_between_rates() {
        // 200 miles at 0.45 + 300 miles at 0.25
        let result = mileage_deduction(dec!(500), dec!(9800));

        assert_eq!(result, Ok(dec!(165.00)));
    }

    #[test]
    fn trip_ending_exactly_at_threshold_is_all_high_rate() {
        let result = mileage_deduction(dec!(200), dec!(9800));

        assert_eq!(result, Ok(dec!(90.00)));
    }

    #[test]
    fn prior_miles_exactly_at_threshold_is_all_low_rate() {
        let result = mileage_deduction(dec!(50), dec!(10000));

        assert_eq!(result, Ok(dec!(12.50)));
    }

    #[test]
    fn zero_mile_trip_deducts_nothing() {
        let result = mileage_deduction(dec!(0), dec!(5000));

        assert_eq!(result, Ok(dec!(0.00)));
    }

    #[test]
    fn fractional_miles_round_once_at_the_end() {
        // 10.5 × 0.45 = 4.725, rounds half-up to 4.73
        let result = mileage_deduction(dec!(10.5), dec!(0));

        assert_eq!(result, Ok(dec!(4.73)));
    }

    // =========================================================================
    // validation
    // =========================================================================

    #[test]
    fn negative_trip_miles_are_rejected() {
        let result = mileage_deduction(dec!(-1), dec!(0));

        assert_eq!(
            result,
            Err(InvalidAmountError::Negative("trip miles", dec!(-1)))
        );
    }

    #[test]
    fn negative_prior_miles_are_rejected() {
        let result = mileage_deduction(dec!(10), dec!(-500));

        assert_eq!(
            result,
            Err(InvalidAmountError::Negative("prior year miles", dec!(-500)))
        );
    }

    #[test]
    fn custom_rates_reject_negative_rate() {
        let rates = MileageRates {
            high_rate: dec!(-0.45),
            ..MileageRates::default()
        };

        let result = rates.deduction(dec!(10), dec!(0));

        assert_eq!(result, Err(MileageError::InvalidRate(dec!(-0.45))));
    }

    #[test]
    fn custom_rates_reject_zero_threshold() {
        let rates = MileageRates {
            threshold: dec!(0),
            ..MileageRates::default()
        };

        let result = rates.deduction(dec!(10), dec!(0));

        assert_eq!(result, Err(MileageError::InvalidThreshold(dec!(0))));
    }

    #[test]
    fn default_rates_match_the_hmrc_schedule() {
        let rates = MileageRates::default();

        assert_eq!(rates.high_rate, dec!(0.45));
        assert_eq!(rates.low_rate, dec!(0.25));
        assert_eq!(rates.threshold, dec!(10000));
    }
}
