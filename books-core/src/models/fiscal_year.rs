use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raised by [`FiscalYear::parse_label`] for labels that are not of the
/// form `"YYYY/YYYY"` with consecutive years.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("fiscal year label must look like \"2024/2025\", got {0:?}")]
    Malformed(String),

    #[error("fiscal year label years must be consecutive, got {0:?}")]
    NonConsecutiveYears(String),
}

/// A UK tax year: 6 April (inclusive) through 5 April (inclusive) of the
/// following calendar year.
///
/// Derived purely from a reference date and never stored or mutated; the
/// persistence layer keeps only the `label` on each job row.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use books_core::FiscalYear;
///
/// let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
/// let year = FiscalYear::for_date(date);
///
/// assert_eq!(year.label, "2024/2025");
/// assert_eq!(year.start_date, NaiveDate::from_ymd_opt(2024, 4, 6).unwrap());
/// assert_eq!(year.end_date, NaiveDate::from_ymd_opt(2025, 4, 5).unwrap());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalYear {
    /// Display label, e.g. `"2024/2025"`.
    pub label: String,
    /// 6 April of `start_year`.
    pub start_date: NaiveDate,
    /// 5 April of `end_year`.
    pub end_date: NaiveDate,
    pub start_year: i32,
    pub end_year: i32,
}

impl FiscalYear {
    /// The fiscal year that starts on 6 April of `start_year`.
    pub fn from_start_year(start_year: i32) -> Self {
        let end_year = start_year + 1;
        Self {
            label: format!("{start_year}/{end_year}"),
            start_date: april(start_year, 6),
            end_date: april(end_year, 5),
            start_year,
            end_year,
        }
    }

    /// The fiscal year a calendar date falls into.
    ///
    /// On or after 6 April the date belongs to the fiscal year starting that
    /// calendar year; before 6 April it belongs to the fiscal year that
    /// started the previous calendar year. The boundary is month/day based,
    /// so leap days do not shift it.
    pub fn for_date(date: NaiveDate) -> Self {
        let year = date.year();
        if date >= april(year, 6) {
            Self::from_start_year(year)
        } else {
            Self::from_start_year(year - 1)
        }
    }

    /// The fiscal year containing today's date.
    pub fn current() -> Self {
        Self::for_date(Utc::now().date_naive())
    }

    /// Parses a `"YYYY/YYYY"` label such as `"2024/2025"`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] when the label is not two slash-separated
    /// four-digit years, or the second year is not the first plus one.
    pub fn parse_label(label: &str) -> Result<Self, ParseError> {
        let malformed = || ParseError::Malformed(label.to_string());

        let (start, end) = label.split_once('/').ok_or_else(malformed)?;
        if start.len() != 4 || end.len() != 4 {
            return Err(malformed());
        }
        let start_year: i32 = start.parse().map_err(|_| malformed())?;
        let end_year: i32 = end.parse().map_err(|_| malformed())?;

        if end_year != start_year + 1 {
            return Err(ParseError::NonConsecutiveYears(label.to_string()));
        }

        Ok(Self::from_start_year(start_year))
    }

    /// Whether `date` falls within this fiscal year, bounds inclusive.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// Fiscal years around this one, oldest first. Used to populate
    /// year-selection lists.
    pub fn surrounding_years(&self, years_back: i32, years_forward: i32) -> Vec<FiscalYear> {
        (self.start_year - years_back..=self.start_year + years_forward)
            .map(Self::from_start_year)
            .collect()
    }
}

impl std::fmt::Display for FiscalYear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label)
    }
}

// 6 April and 5 April exist in every calendar year chrono can represent
// within the four-digit range this crate deals in.
fn april(year: i32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, 4, day).expect("April dates are valid in every year")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // =========================================================================
    // for_date boundary tests
    // =========================================================================

    #[test]
    fn april_fifth_belongs_to_previous_fiscal_year() {
        let year = FiscalYear::for_date(date(2025, 4, 5));

        assert_eq!(year.label, "2024/2025");
    }

    #[test]
    fn april_sixth_starts_a_new_fiscal_year() {
        let year = FiscalYear::for_date(date(2025, 4, 6));

        assert_eq!(year.label, "2025/2026");
    }

    #[test]
    fn december_thirty_first_stays_in_current_fiscal_year() {
        let year = FiscalYear::for_date(date(2024, 12, 31));

        assert_eq!(year.label, "2024/2025");
    }

    #[test]
    fn january_first_does_not_roll_the_fiscal_year() {
        let year = FiscalYear::for_date(date(2025, 1, 1));

        assert_eq!(year.label, "2024/2025");
    }

    #[test]
    fn leap_day_resolves_like_any_other_pre_april_date() {
        let year = FiscalYear::for_date(date(2024, 2, 29));

        assert_eq!(year.label, "2023/2024");
    }

    #[test]
    fn every_resolved_date_sits_inside_its_own_window() {
        let dates = [
            date(2024, 4, 5),
            date(2024, 4, 6),
            date(2024, 7, 1),
            date(2025, 1, 1),
            date(2025, 4, 5),
        ];

        for d in dates {
            let year = FiscalYear::for_date(d);
            assert!(year.contains(d), "{d} outside {year}");
        }
    }

    // =========================================================================
    // constructor and window tests
    // =========================================================================

    #[test]
    fn from_start_year_builds_the_april_window() {
        let year = FiscalYear::from_start_year(2024);

        assert_eq!(year.start_date, date(2024, 4, 6));
        assert_eq!(year.end_date, date(2025, 4, 5));
        assert_eq!(year.start_year, 2024);
        assert_eq!(year.end_year, 2025);
        assert_eq!(year.label, "2024/2025");
    }

    #[test]
    fn contains_is_inclusive_at_both_bounds() {
        let year = FiscalYear::from_start_year(2024);

        assert!(year.contains(date(2024, 4, 6)));
        assert!(year.contains(date(2025, 4, 5)));
        assert!(!year.contains(date(2024, 4, 5)));
        assert!(!year.contains(date(2025, 4, 6)));
    }

    #[test]
    fn surrounding_years_lists_oldest_first() {
        let year = FiscalYear::from_start_year(2024);

        let years: Vec<String> = year
            .surrounding_years(2, 1)
            .into_iter()
            .map(|y| y.label)
            .collect();

        assert_eq!(
            years,
            vec!["2022/2023", "2023/2024", "2024/2025", "2025/2026"]
        );
    }

    // =========================================================================
    // parse_label tests
    // =========================================================================

    #[test]
    fn parse_label_round_trips() {
        let year = FiscalYear::parse_label("2024/2025").unwrap();

        assert_eq!(year, FiscalYear::from_start_year(2024));
    }

    #[test]
    fn parse_label_rejects_missing_slash() {
        let result = FiscalYear::parse_label("20242025");

        assert_eq!(result, Err(ParseError::Malformed("20242025".to_string())));
    }

    #[test]
    fn parse_label_rejects_short_years() {
        let result = FiscalYear::parse_label("2024/25");

        assert_eq!(result, Err(ParseError::Malformed("2024/25".to_string())));
    }

    #[test]
    fn parse_label_rejects_non_numeric_years() {
        let result = FiscalYear::parse_label("abcd/efgh");

        assert_eq!(result, Err(ParseError::Malformed("abcd/efgh".to_string())));
    }

    #[test]
    fn parse_label_rejects_non_consecutive_years() {
        let result = FiscalYear::parse_label("2024/2026");

        assert_eq!(
            result,
            Err(ParseError::NonConsecutiveYears("2024/2026".to_string()))
        );
    }
}
