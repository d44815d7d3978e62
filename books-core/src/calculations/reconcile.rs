//! Payment reconciliation: deriving an invoice's status and balance from
//! its recorded payments.
//!
//! Reconciliation is always recomputed from the complete, freshly-read
//! payment set — status is never patched incrementally, so the stored value
//! cannot drift from the true payment sum. The persistence layer re-runs
//! this inside the same transaction as any payment insert or delete.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::calculations::common::{InvalidAmountError, round_half_up};
use crate::models::{Payment, PaymentStatus};

/// Outcome of reconciling an invoice total against its payments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    /// Sum of recorded payments, rounded to the penny.
    pub total_paid: Decimal,
    /// `invoice_total - total_paid`. Negative when overpaid; the signed
    /// value is kept for audit.
    pub balance: Decimal,
    pub status: PaymentStatus,
}

impl Reconciliation {
    /// The outstanding balance floored at zero, for display.
    pub fn display_balance(&self) -> Decimal {
        self.balance.max(Decimal::ZERO)
    }
}

/// Derives the payment status and balance for an invoice.
///
/// Status precedence: paid when `total_paid >= invoice_total`, else partial
/// when anything has been paid, else unpaid. Deterministic and stateless —
/// the same inputs always reconcile to the same output.
///
/// # Errors
///
/// Returns [`InvalidAmountError`] when the invoice total is negative or any
/// payment amount is not strictly positive.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use books_core::PaymentStatus;
/// use books_core::calculations::reconcile::reconcile_amounts;
///
/// let result = reconcile_amounts(dec!(1000.00), &[dec!(300.00), dec!(400.00)]).unwrap();
///
/// assert_eq!(result.total_paid, dec!(700.00));
/// assert_eq!(result.balance, dec!(300.00));
/// assert_eq!(result.status, PaymentStatus::Partial);
/// ```
pub fn reconcile(
    invoice_total: Decimal,
    payments: &[Payment],
) -> Result<Reconciliation, InvalidAmountError> {
    let amounts: Vec<Decimal> = payments.iter().map(|p| p.amount).collect();
    reconcile_amounts(invoice_total, &amounts)
}

/// [`reconcile`] over bare amounts, for callers that have not materialised
/// full payment rows.
pub fn reconcile_amounts(
    invoice_total: Decimal,
    amounts: &[Decimal],
) -> Result<Reconciliation, InvalidAmountError> {
    if invoice_total < Decimal::ZERO {
        return Err(InvalidAmountError::Negative("invoice total", invoice_total));
    }
    for &amount in amounts {
        if amount <= Decimal::ZERO {
            return Err(InvalidAmountError::NonPositivePayment(amount));
        }
    }

    let total_paid = round_half_up(amounts.iter().copied().sum());
    let balance = invoice_total - total_paid;

    let status = if total_paid >= invoice_total {
        PaymentStatus::Paid
    } else if total_paid > Decimal::ZERO {
        PaymentStatus::Partial
    } else {
        PaymentStatus::Unpaid
    };

    if balance < Decimal::ZERO {
        warn!(
            invoice_total = %invoice_total,
            total_paid = %total_paid,
            "payments exceed the invoice total"
        );
    }

    Ok(Reconciliation {
        total_paid,
        balance,
        status,
    })
}
