//! Invoice numbering and due-date arithmetic.
//!
//! Numbering is scoped to the calendar year the invoice is issued in, not
//! the fiscal year — a deliberate, distinct boundary from
//! [`FiscalYear`](crate::FiscalYear). The invoice count for the user/year
//! is supplied by the persistence layer, which also owns the uniqueness
//! constraint and the retry on collision; this module only formats the
//! candidate number.

use chrono::{Days, NaiveDate};

use crate::models::PaymentStatus;

/// Payment terms applied when a job does not specify its own.
pub const DEFAULT_PAYMENT_TERMS_DAYS: u32 = 30;

/// The next sequential invoice number for a user and calendar year,
/// formatted `INV-{year}-{NNNN}`.
///
/// `existing_count_this_year` is the count of invoices the user has already
/// numbered in `year`; the sequence is that count plus one, zero-padded to
/// four digits (widening past 9,999 rather than truncating).
///
/// # Examples
///
/// ```
/// use books_core::calculations::next_invoice_number;
///
/// assert_eq!(next_invoice_number(0, 2025), "INV-2025-0001");
/// assert_eq!(next_invoice_number(41, 2025), "INV-2025-0042");
/// ```
pub fn next_invoice_number(existing_count_this_year: u32, year: i32) -> String {
    format!("INV-{year}-{:04}", existing_count_this_year + 1)
}

/// Due date for an invoice: plain calendar addition of the payment terms,
/// with no business-day adjustment.
pub fn compute_due_date(issue_date: NaiveDate, payment_terms_days: u32) -> NaiveDate {
    issue_date + Days::new(u64::from(payment_terms_days))
}

/// Whole days an invoice is overdue as of `today`.
///
/// Zero when the invoice is paid, has no due date yet, or is not yet due.
pub fn days_overdue(due_date: Option<NaiveDate>, today: NaiveDate, status: PaymentStatus) -> i64 {
    match due_date {
        Some(due) if status != PaymentStatus::Paid => (today - due).num_days().max(0),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // =========================================================================
    // next_invoice_number
    // =========================================================================

    #[test]
    fn first_invoice_of_the_year_is_0001() {
        let number = next_invoice_number(0, 2025);

        assert_eq!(number, "INV-2025-0001");
    }

    #[test]
    fn sequence_is_count_plus_one_zero_padded() {
        let number = next_invoice_number(41, 2025);

        assert_eq!(number, "INV-2025-0042");
    }

    #[test]
    fn sequence_widens_past_four_digits() {
        let number = next_invoice_number(9999, 2025);

        assert_eq!(number, "INV-2025-10000");
    }

    #[test]
    fn numbering_is_scoped_by_calendar_year() {
        // Same count, different years, distinct numbers.
        assert_eq!(next_invoice_number(7, 2024), "INV-2024-0008");
        assert_eq!(next_invoice_number(7, 2025), "INV-2025-0008");
    }

    // =========================================================================
    // compute_due_date
    // =========================================================================

    #[test]
    fn due_date_is_issue_plus_terms() {
        let due = compute_due_date(date(2025, 1, 15), 30);

        assert_eq!(due, date(2025, 2, 14));
    }

    #[test]
    fn due_date_crosses_month_and_year_boundaries() {
        let due = compute_due_date(date(2024, 12, 20), 14);

        assert_eq!(due, date(2025, 1, 3));
    }

    #[test]
    fn zero_day_terms_fall_due_on_the_issue_date() {
        let due = compute_due_date(date(2025, 3, 1), 0);

        assert_eq!(due, date(2025, 3, 1));
    }

    #[test]
    fn due_date_handles_leap_february() {
        let due = compute_due_date(date(2024, 2, 15), 14);

        assert_eq!(due, date(2024, 2, 29));
    }

    // =========================================================================
    // days_overdue
    // =========================================================================

    #[test]
    fn overdue_counts_days_past_the_due_date() {
        let days = days_overdue(
            Some(date(2025, 1, 1)),
            date(2025, 1, 11),
            PaymentStatus::Unpaid,
        );

        assert_eq!(days, 10);
    }

    #[test]
    fn not_yet_due_is_zero() {
        let days = days_overdue(
            Some(date(2025, 2, 1)),
            date(2025, 1, 11),
            PaymentStatus::Unpaid,
        );

        assert_eq!(days, 0);
    }

    #[test]
    fn due_today_is_not_overdue() {
        let days = days_overdue(
            Some(date(2025, 1, 11)),
            date(2025, 1, 11),
            PaymentStatus::Partial,
        );

        assert_eq!(days, 0);
    }

    #[test]
    fn paid_invoices_are_never_overdue() {
        let days = days_overdue(
            Some(date(2025, 1, 1)),
            date(2025, 6, 1),
            PaymentStatus::Paid,
        );

        assert_eq!(days, 0);
    }

    #[test]
    fn missing_due_date_is_zero() {
        let days = days_overdue(None, date(2025, 6, 1), PaymentStatus::Unpaid);

        assert_eq!(days, 0);
    }
}
