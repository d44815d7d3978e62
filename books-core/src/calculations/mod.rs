//! The bookkeeping calculation engine: pure, deterministic functions with
//! no side effects and no storage access of their own. Collaborators pass
//! plain data in and get plain results back.

pub mod common;
pub mod invoicing;
pub mod mileage;
pub mod reconcile;
pub mod vat;

pub use common::InvalidAmountError;
pub use invoicing::{
    DEFAULT_PAYMENT_TERMS_DAYS, compute_due_date, days_overdue, next_invoice_number,
};
pub use mileage::{MileageError, MileageRates, mileage_deduction};
pub use reconcile::{Reconciliation, reconcile, reconcile_amounts};
pub use vat::{STANDARD_VAT_RATE_PERCENT, net_from_gross, vat_from_gross};
