use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::calculations::common::InvalidAmountError;
use crate::models::{
    FiscalYear, Job, MileageEntry, NewJob, NewMileageEntry, NewPayment, NewReceipt, Payment,
    Receipt, TaxYearSummary,
};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invoice numbering lost the uniqueness race on every retry.
    #[error("invoice numbering still contended after {0} attempts")]
    InvoiceNumberContention(u32),

    #[error(transparent)]
    Invalid(#[from] InvalidAmountError),
}

/// The persistence collaborator for the bookkeeping core.
///
/// Implementations own all mutation and are the single authoritative source
/// the derived calculations read from. Two operations carry correctness
/// obligations beyond plain CRUD:
///
/// * [`generate_invoice`](Self::generate_invoice) must enforce uniqueness of
///   `(user, invoice_number)` and retry with a re-queried count when a
///   concurrent writer takes the candidate number first.
/// * [`record_payment`](Self::record_payment) and
///   [`delete_payment`](Self::delete_payment) must re-read the full payment
///   set and write the reconciled status in the same transaction as the
///   payment change, so the stored status never drifts from the payment sum.
#[async_trait]
pub trait BooksRepository: Send + Sync {
    // Jobs
    async fn create_job(&self, job: NewJob) -> Result<Job, RepositoryError>;
    async fn get_job(&self, id: i64) -> Result<Job, RepositoryError>;
    async fn update_job(&self, job: &Job) -> Result<(), RepositoryError>;
    async fn delete_job(&self, id: i64) -> Result<(), RepositoryError>;
    async fn list_jobs(
        &self,
        user_id: &str,
        tax_year: Option<&str>,
    ) -> Result<Vec<Job>, RepositoryError>;

    // Invoicing
    /// Count of invoices already numbered for this user in this calendar
    /// year. Input to the numbering calculation.
    async fn count_numbered_invoices(
        &self,
        user_id: &str,
        calendar_year: i32,
    ) -> Result<u32, RepositoryError>;

    /// Assigns the job its invoice number and due date, if it has neither,
    /// and returns the updated job. Idempotent for already-numbered jobs.
    async fn generate_invoice(
        &self,
        job_id: i64,
        issue_date: NaiveDate,
    ) -> Result<Job, RepositoryError>;

    // Payments
    async fn payments_for_job(&self, job_id: i64) -> Result<Vec<Payment>, RepositoryError>;
    async fn record_payment(&self, payment: NewPayment) -> Result<Payment, RepositoryError>;
    async fn delete_payment(&self, payment_id: i64) -> Result<(), RepositoryError>;

    // Receipts
    async fn record_receipt(&self, receipt: NewReceipt) -> Result<Receipt, RepositoryError>;
    async fn receipts_for_job(&self, job_id: i64) -> Result<Vec<Receipt>, RepositoryError>;
    async fn delete_receipt(&self, receipt_id: i64) -> Result<(), RepositoryError>;

    // Mileage
    async fn record_mileage(
        &self,
        entry: NewMileageEntry,
    ) -> Result<MileageEntry, RepositoryError>;
    async fn mileage_entries_for_job(
        &self,
        job_id: i64,
    ) -> Result<Vec<MileageEntry>, RepositoryError>;

    /// Total miles logged by the user within the fiscal-year window. Feeds
    /// `prior_year_miles` when a new trip is recorded.
    async fn fiscal_year_miles(
        &self,
        user_id: &str,
        year: &FiscalYear,
    ) -> Result<Decimal, RepositoryError>;

    // Reports
    async fn tax_year_summary(
        &self,
        user_id: &str,
        year: &FiscalYear,
    ) -> Result<TaxYearSummary, RepositoryError>;
}
