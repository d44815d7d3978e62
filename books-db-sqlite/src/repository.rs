use std::path::Path;

use async_trait::async_trait;
use books_core::calculations::{
    DEFAULT_PAYMENT_TERMS_DAYS, InvalidAmountError, STANDARD_VAT_RATE_PERCENT, compute_due_date,
    mileage_deduction, next_invoice_number, reconcile_amounts, vat_from_gross,
};
use books_core::{
    BooksRepository, FiscalYear, Job, JobStatus, MileageEntry, NewJob, NewMileageEntry, NewPayment,
    NewReceipt, Payment, PaymentMethod, PaymentStatus, Receipt, RepositoryError, TaxYearSummary,
};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, sqlite::SqlitePool};
use tracing::{debug, warn};

/// How many times invoice numbering re-reads the count and retries after
/// losing the uniqueness race to a concurrent writer.
const MAX_NUMBERING_ATTEMPTS: u32 = 5;

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub async fn new(database_url: &str) -> Result<Self, RepositoryError> {
        let pool = SqlitePool::connect(database_url)
            .await
            .map_err(|e| RepositoryError::Connection(e.to_string()))?;
        Ok(Self { pool })
    }

    pub async fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<(), RepositoryError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        Ok(())
    }

    /// Load and execute all SQL seed files from the specified directory.
    /// Files are executed in alphabetical order by filename.
    pub async fn run_seeds(&self, seeds_dir: &Path) -> Result<(), RepositoryError> {
        let mut entries: Vec<_> = std::fs::read_dir(seeds_dir)
            .map_err(|e| {
                RepositoryError::Configuration(format!(
                    "Failed to read seeds directory '{}': {}",
                    seeds_dir.display(),
                    e
                ))
            })?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "sql"))
            .collect();

        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            let sql = std::fs::read_to_string(&path).map_err(|e| {
                RepositoryError::Configuration(format!(
                    "Failed to read seed file '{}': {}",
                    path.display(),
                    e
                ))
            })?;

            sqlx::raw_sql(&sql)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    RepositoryError::Database(format!(
                        "Failed to execute seed file '{}': {}",
                        path.display(),
                        e
                    ))
                })?;
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[derive(FromRow)]
struct JobRow {
    id: i64,
    user_id: String,
    property_address: String,
    job_type: String,
    description: Option<String>,
    customer_name: Option<String>,
    customer_phone: Option<String>,
    customer_email: Option<String>,
    amount_invoiced: String,
    amount_paid: String,
    payment_status: String,
    invoice_number: Option<String>,
    payment_terms_days: Option<i64>,
    issue_date: Option<String>,
    due_date: Option<String>,
    job_date: String,
    completion_date: Option<String>,
    tax_year: String,
    status: String,
    notes: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<JobRow> for Job {
    type Error = RepositoryError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        Ok(Job {
            id: row.id,
            user_id: row.user_id,
            property_address: row.property_address,
            job_type: row.job_type,
            description: row.description,
            customer_name: row.customer_name,
            customer_phone: row.customer_phone,
            customer_email: row.customer_email,
            amount_invoiced: parse_decimal(&row.amount_invoiced)?,
            amount_paid: parse_decimal(&row.amount_paid)?,
            payment_status: PaymentStatus::parse(&row.payment_status).ok_or_else(|| {
                RepositoryError::Database(format!(
                    "Unknown payment status '{}'",
                    row.payment_status
                ))
            })?,
            invoice_number: row.invoice_number,
            payment_terms_days: row
                .payment_terms_days
                .map(|days| {
                    u32::try_from(days).map_err(|_| {
                        RepositoryError::Database(format!("Invalid payment terms '{days}'"))
                    })
                })
                .transpose()?,
            issue_date: parse_optional_date(&row.issue_date)?,
            due_date: parse_optional_date(&row.due_date)?,
            job_date: parse_date(&row.job_date)?,
            completion_date: parse_optional_date(&row.completion_date)?,
            tax_year: row.tax_year,
            status: JobStatus::parse(&row.status).ok_or_else(|| {
                RepositoryError::Database(format!("Unknown job status '{}'", row.status))
            })?,
            notes: row.notes,
            created_at: parse_datetime(&row.created_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
        })
    }
}

#[derive(FromRow)]
struct PaymentRow {
    id: i64,
    user_id: String,
    job_id: i64,
    amount: String,
    payment_date: String,
    payment_method: String,
    reference: Option<String>,
    notes: Option<String>,
    created_at: String,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = RepositoryError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Payment {
            id: row.id,
            user_id: row.user_id,
            job_id: row.job_id,
            amount: parse_decimal(&row.amount)?,
            payment_date: parse_date(&row.payment_date)?,
            method: PaymentMethod::parse(&row.payment_method).ok_or_else(|| {
                RepositoryError::Database(format!(
                    "Unknown payment method '{}'",
                    row.payment_method
                ))
            })?,
            reference: row.reference,
            notes: row.notes,
            created_at: parse_datetime(&row.created_at)?,
        })
    }
}

#[derive(FromRow)]
struct ReceiptRow {
    id: i64,
    user_id: String,
    job_id: i64,
    receipt_date: String,
    supplier: String,
    amount: String,
    vat_amount: String,
    category: String,
    items_description: Option<String>,
    notes: Option<String>,
    created_at: String,
}

impl TryFrom<ReceiptRow> for Receipt {
    type Error = RepositoryError;

    fn try_from(row: ReceiptRow) -> Result<Self, Self::Error> {
        Ok(Receipt {
            id: row.id,
            user_id: row.user_id,
            job_id: row.job_id,
            receipt_date: parse_date(&row.receipt_date)?,
            supplier: row.supplier,
            amount: parse_decimal(&row.amount)?,
            vat_amount: parse_decimal(&row.vat_amount)?,
            category: books_core::ReceiptCategory::parse(&row.category).ok_or_else(|| {
                RepositoryError::Database(format!("Unknown receipt category '{}'", row.category))
            })?,
            items_description: row.items_description,
            notes: row.notes,
            created_at: parse_datetime(&row.created_at)?,
        })
    }
}

#[derive(FromRow)]
struct MileageRow {
    id: i64,
    user_id: String,
    job_id: i64,
    trip_date: String,
    from_location: String,
    to_location: String,
    miles: String,
    deduction: String,
    purpose: Option<String>,
    notes: Option<String>,
    created_at: String,
}

impl TryFrom<MileageRow> for MileageEntry {
    type Error = RepositoryError;

    fn try_from(row: MileageRow) -> Result<Self, Self::Error> {
        Ok(MileageEntry {
            id: row.id,
            user_id: row.user_id,
            job_id: row.job_id,
            trip_date: parse_date(&row.trip_date)?,
            from_location: row.from_location,
            to_location: row.to_location,
            miles: parse_decimal(&row.miles)?,
            deduction: parse_decimal(&row.deduction)?,
            purpose: row.purpose,
            notes: row.notes,
            created_at: parse_datetime(&row.created_at)?,
        })
    }
}

fn parse_decimal(s: &str) -> Result<Decimal, RepositoryError> {
    s.parse::<Decimal>()
        .map_err(|e| RepositoryError::Database(format!("Failed to parse decimal '{}': {}", s, e)))
}

fn parse_date(s: &str) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| RepositoryError::Database(format!("Failed to parse date '{}': {}", s, e)))
}

fn parse_optional_date(s: &Option<String>) -> Result<Option<NaiveDate>, RepositoryError> {
    s.as_ref().map(|s| parse_date(s)).transpose()
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    // SQLite stores timestamps in various formats, try common ones
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|e| RepositoryError::Database(format!("Failed to parse datetime '{}': {}", s, e)))
}

fn date_string(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn now_string() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.message().contains("UNIQUE constraint failed"))
}

const SELECT_JOB: &str = "SELECT id, user_id, property_address, job_type, description,
        customer_name, customer_phone, customer_email,
        amount_invoiced, amount_paid, payment_status,
        invoice_number, payment_terms_days, issue_date, due_date,
        job_date, completion_date, tax_year, status, notes,
        created_at, updated_at
 FROM jobs";

const SELECT_PAYMENT: &str = "SELECT id, user_id, job_id, amount, payment_date, payment_method,
        reference, notes, created_at
 FROM payments";

#[async_trait]
impl BooksRepository for SqliteRepository {
    async fn create_job(&self, job: NewJob) -> Result<Job, RepositoryError> {
        if job.amount_invoiced < Decimal::ZERO {
            return Err(InvalidAmountError::Negative("invoice total", job.amount_invoiced).into());
        }

        let tax_year = FiscalYear::for_date(job.job_date).label;
        let now = now_string();

        let result = sqlx::query(
            "INSERT INTO jobs (
                user_id, property_address, job_type, description,
                customer_name, customer_phone, customer_email,
                amount_invoiced, amount_paid, payment_status,
                payment_terms_days, job_date, completion_date,
                tax_year, status, notes, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, '0', 'unpaid', ?, ?, ?, ?, 'active', ?, ?, ?)",
        )
        .bind(&job.user_id)
        .bind(&job.property_address)
        .bind(&job.job_type)
        .bind(&job.description)
        .bind(&job.customer_name)
        .bind(&job.customer_phone)
        .bind(&job.customer_email)
        .bind(job.amount_invoiced.to_string())
        .bind(job.payment_terms_days.map(i64::from))
        .bind(date_string(job.job_date))
        .bind(job.completion_date.map(date_string))
        .bind(&tax_year)
        .bind(&job.notes)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        self.get_job(result.last_insert_rowid()).await
    }

    async fn get_job(&self, id: i64) -> Result<Job, RepositoryError> {
        let row: JobRow = sqlx::query_as(&format!("{SELECT_JOB} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?
            .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    async fn update_job(&self, job: &Job) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE jobs SET
                property_address = ?, job_type = ?, description = ?,
                customer_name = ?, customer_phone = ?, customer_email = ?,
                amount_invoiced = ?, payment_terms_days = ?,
                job_date = ?, completion_date = ?, tax_year = ?,
                status = ?, notes = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&job.property_address)
        .bind(&job.job_type)
        .bind(&job.description)
        .bind(&job.customer_name)
        .bind(&job.customer_phone)
        .bind(&job.customer_email)
        .bind(job.amount_invoiced.to_string())
        .bind(job.payment_terms_days.map(i64::from))
        .bind(date_string(job.job_date))
        .bind(job.completion_date.map(date_string))
        .bind(&job.tax_year)
        .bind(job.status.as_str())
        .bind(&job.notes)
        .bind(now_string())
        .bind(job.id)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_job(&self, id: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list_jobs(
        &self,
        user_id: &str,
        tax_year: Option<&str>,
    ) -> Result<Vec<Job>, RepositoryError> {
        let rows: Vec<JobRow> = match tax_year {
            Some(year) => {
                sqlx::query_as(&format!(
                    "{SELECT_JOB} WHERE user_id = ? AND tax_year = ? ORDER BY job_date DESC, id DESC"
                ))
                .bind(user_id)
                .bind(year)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as(&format!(
                    "{SELECT_JOB} WHERE user_id = ? ORDER BY job_date DESC, id DESC"
                ))
                .bind(user_id)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn count_numbered_invoices(
        &self,
        user_id: &str,
        calendar_year: i32,
    ) -> Result<u32, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM jobs
             WHERE user_id = ? AND invoice_number LIKE ?",
        )
        .bind(user_id)
        .bind(format!("INV-{calendar_year}-%"))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        u32::try_from(count)
            .map_err(|_| RepositoryError::Database(format!("Invalid invoice count {count}")))
    }

    /// Numbering is optimistic: read the count, format the candidate, and
    /// try to claim it under the `UNIQUE (user_id, invoice_number)`
    /// constraint. A concurrent writer taking the same number fails this
    /// write, and we retry with a re-queried count.
    async fn generate_invoice(
        &self,
        job_id: i64,
        issue_date: NaiveDate,
    ) -> Result<Job, RepositoryError> {
        let year = issue_date.year();

        for attempt in 1..=MAX_NUMBERING_ATTEMPTS {
            let job = self.get_job(job_id).await?;
            if job.invoice_number.is_some() {
                // Already invoiced; the number is stable for life.
                return Ok(job);
            }

            let count = self.count_numbered_invoices(&job.user_id, year).await?;
            let number = next_invoice_number(count, year);
            let terms = job.payment_terms_days.unwrap_or(DEFAULT_PAYMENT_TERMS_DAYS);
            let due_date = compute_due_date(issue_date, terms);

            let result = sqlx::query(
                "UPDATE jobs SET invoice_number = ?, issue_date = ?, due_date = ?, updated_at = ?
                 WHERE id = ? AND invoice_number IS NULL",
            )
            .bind(&number)
            .bind(date_string(issue_date))
            .bind(date_string(due_date))
            .bind(now_string())
            .bind(job_id)
            .execute(&self.pool)
            .await;

            match result {
                Ok(done) if done.rows_affected() == 1 => {
                    debug!(job_id, number = %number, "assigned invoice number");
                    return self.get_job(job_id).await;
                }
                // Another writer numbered this same job between our read and
                // write; loop around and return its number.
                Ok(_) => continue,
                Err(ref e) if is_unique_violation(e) => {
                    warn!(
                        job_id,
                        number = %number,
                        attempt,
                        "invoice number already taken, retrying with fresh count"
                    );
                    continue;
                }
                Err(e) => return Err(RepositoryError::Database(e.to_string())),
            }
        }

        Err(RepositoryError::InvoiceNumberContention(
            MAX_NUMBERING_ATTEMPTS,
        ))
    }

    async fn payments_for_job(&self, job_id: i64) -> Result<Vec<Payment>, RepositoryError> {
        let rows: Vec<PaymentRow> = sqlx::query_as(&format!(
            "{SELECT_PAYMENT} WHERE job_id = ? ORDER BY payment_date DESC, id DESC"
        ))
        .bind(job_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    /// The payment insert, the re-read of the full payment set, and the
    /// reconciled status write all happen in one transaction, so the stored
    /// status can never drift from the payment sum.
    async fn record_payment(&self, payment: NewPayment) -> Result<Payment, RepositoryError> {
        if payment.amount <= Decimal::ZERO {
            return Err(InvalidAmountError::NonPositivePayment(payment.amount).into());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let (amount_invoiced,): (String,) =
            sqlx::query_as("SELECT amount_invoiced FROM jobs WHERE id = ?")
                .bind(payment.job_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| RepositoryError::Database(e.to_string()))?
                .ok_or(RepositoryError::NotFound)?;
        let amount_invoiced = parse_decimal(&amount_invoiced)?;

        let inserted = sqlx::query(
            "INSERT INTO payments (
                user_id, job_id, amount, payment_date, payment_method,
                reference, notes, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&payment.user_id)
        .bind(payment.job_id)
        .bind(payment.amount.to_string())
        .bind(date_string(payment.payment_date))
        .bind(payment.method.as_str())
        .bind(&payment.reference)
        .bind(&payment.notes)
        .bind(now_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;
        let payment_id = inserted.last_insert_rowid();

        reconcile_job_in_tx(&mut tx, payment.job_id, amount_invoiced).await?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let row: PaymentRow = sqlx::query_as(&format!("{SELECT_PAYMENT} WHERE id = ?"))
            .bind(payment_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        row.try_into()
    }

    async fn delete_payment(&self, payment_id: i64) -> Result<(), RepositoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let (job_id,): (i64,) = sqlx::query_as("SELECT job_id FROM payments WHERE id = ?")
            .bind(payment_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?
            .ok_or(RepositoryError::NotFound)?;

        sqlx::query("DELETE FROM payments WHERE id = ?")
            .bind(payment_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let (amount_invoiced,): (String,) =
            sqlx::query_as("SELECT amount_invoiced FROM jobs WHERE id = ?")
                .bind(job_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| RepositoryError::Database(e.to_string()))?;
        let amount_invoiced = parse_decimal(&amount_invoiced)?;

        reconcile_job_in_tx(&mut tx, job_id, amount_invoiced).await?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))
    }

    async fn record_receipt(&self, receipt: NewReceipt) -> Result<Receipt, RepositoryError> {
        // Back-calculates the VAT portion; rejects negative amounts.
        let vat_amount = vat_from_gross(receipt.amount, STANDARD_VAT_RATE_PERCENT)?;

        let result = sqlx::query(
            "INSERT INTO receipts (
                user_id, job_id, receipt_date, supplier, amount, vat_amount,
                category, items_description, notes, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&receipt.user_id)
        .bind(receipt.job_id)
        .bind(date_string(receipt.receipt_date))
        .bind(&receipt.supplier)
        .bind(receipt.amount.to_string())
        .bind(vat_amount.to_string())
        .bind(receipt.category.as_str())
        .bind(&receipt.items_description)
        .bind(&receipt.notes)
        .bind(now_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let row: ReceiptRow = sqlx::query_as(
            "SELECT id, user_id, job_id, receipt_date, supplier, amount, vat_amount,
                    category, items_description, notes, created_at
             FROM receipts WHERE id = ?",
        )
        .bind(result.last_insert_rowid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        row.try_into()
    }

    async fn receipts_for_job(&self, job_id: i64) -> Result<Vec<Receipt>, RepositoryError> {
        let rows: Vec<ReceiptRow> = sqlx::query_as(
            "SELECT id, user_id, job_id, receipt_date, supplier, amount, vat_amount,
                    category, items_description, notes, created_at
             FROM receipts WHERE job_id = ? ORDER BY receipt_date DESC, id DESC",
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn delete_receipt(&self, receipt_id: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM receipts WHERE id = ?")
            .bind(receipt_id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// The trip's deduction is tiered against the fiscal-year miles already
    /// logged, so the prior-mileage read and the insert share a transaction.
    async fn record_mileage(
        &self,
        entry: NewMileageEntry,
    ) -> Result<MileageEntry, RepositoryError> {
        let fiscal_year = FiscalYear::for_date(entry.trip_date);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT miles FROM mileage_entries
             WHERE user_id = ? AND trip_date BETWEEN ? AND ?",
        )
        .bind(&entry.user_id)
        .bind(date_string(fiscal_year.start_date))
        .bind(date_string(fiscal_year.end_date))
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let mut prior_miles = Decimal::ZERO;
        for (miles,) in &rows {
            prior_miles += parse_decimal(miles)?;
        }

        let deduction = mileage_deduction(entry.miles, prior_miles)?;

        let result = sqlx::query(
            "INSERT INTO mileage_entries (
                user_id, job_id, trip_date, from_location, to_location,
                miles, deduction, purpose, notes, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&entry.user_id)
        .bind(entry.job_id)
        .bind(date_string(entry.trip_date))
        .bind(&entry.from_location)
        .bind(&entry.to_location)
        .bind(entry.miles.to_string())
        .bind(deduction.to_string())
        .bind(&entry.purpose)
        .bind(&entry.notes)
        .bind(now_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let row: MileageRow = sqlx::query_as(
            "SELECT id, user_id, job_id, trip_date, from_location, to_location,
                    miles, deduction, purpose, notes, created_at
             FROM mileage_entries WHERE id = ?",
        )
        .bind(result.last_insert_rowid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        row.try_into()
    }

    async fn mileage_entries_for_job(
        &self,
        job_id: i64,
    ) -> Result<Vec<MileageEntry>, RepositoryError> {
        let rows: Vec<MileageRow> = sqlx::query_as(
            "SELECT id, user_id, job_id, trip_date, from_location, to_location,
                    miles, deduction, purpose, notes, created_at
             FROM mileage_entries WHERE job_id = ? ORDER BY trip_date DESC, id DESC",
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn fiscal_year_miles(
        &self,
        user_id: &str,
        year: &FiscalYear,
    ) -> Result<Decimal, RepositoryError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT miles FROM mileage_entries
             WHERE user_id = ? AND trip_date BETWEEN ? AND ?",
        )
        .bind(user_id)
        .bind(date_string(year.start_date))
        .bind(date_string(year.end_date))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let mut total = Decimal::ZERO;
        for (miles,) in &rows {
            total += parse_decimal(miles)?;
        }
        Ok(total)
    }

    /// Sums are taken over TEXT-stored decimals in Rust rather than with
    /// SQL SUM, which would coerce to floating point and lose penny
    /// exactness.
    async fn tax_year_summary(
        &self,
        user_id: &str,
        year: &FiscalYear,
    ) -> Result<TaxYearSummary, RepositoryError> {
        let start = date_string(year.start_date);
        let end = date_string(year.end_date);

        let job_rows: Vec<(String,)> = sqlx::query_as(
            "SELECT amount_invoiced FROM jobs
             WHERE user_id = ? AND job_date BETWEEN ? AND ?",
        )
        .bind(user_id)
        .bind(&start)
        .bind(&end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let job_count = job_rows.len() as i64;
        let mut total_income = Decimal::ZERO;
        for (amount,) in &job_rows {
            total_income += parse_decimal(amount)?;
        }

        let receipt_rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT amount, vat_amount FROM receipts
             WHERE user_id = ? AND receipt_date BETWEEN ? AND ?",
        )
        .bind(user_id)
        .bind(&start)
        .bind(&end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let mut total_costs = Decimal::ZERO;
        let mut total_vat = Decimal::ZERO;
        for (amount, vat) in &receipt_rows {
            total_costs += parse_decimal(amount)?;
            total_vat += parse_decimal(vat)?;
        }

        let mileage_rows: Vec<(String,)> = sqlx::query_as(
            "SELECT deduction FROM mileage_entries
             WHERE user_id = ? AND trip_date BETWEEN ? AND ?",
        )
        .bind(user_id)
        .bind(&start)
        .bind(&end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let mut mileage_deduction_total = Decimal::ZERO;
        for (deduction,) in &mileage_rows {
            mileage_deduction_total += parse_decimal(deduction)?;
        }

        Ok(TaxYearSummary {
            year_label: year.label.clone(),
            total_income,
            total_costs,
            total_profit: total_income - total_costs,
            total_vat,
            mileage_deduction: mileage_deduction_total,
            job_count,
        })
    }
}

/// Re-reads the complete payment set for a job and writes the reconciled
/// totals back, inside the caller's transaction.
async fn reconcile_job_in_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    job_id: i64,
    amount_invoiced: Decimal,
) -> Result<(), RepositoryError> {
    let rows: Vec<(String,)> = sqlx::query_as("SELECT amount FROM payments WHERE job_id = ?")
        .bind(job_id)
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

    let mut amounts = Vec::with_capacity(rows.len());
    for (amount,) in &rows {
        amounts.push(parse_decimal(amount)?);
    }

    let reconciliation = reconcile_amounts(amount_invoiced, &amounts)?;

    sqlx::query("UPDATE jobs SET amount_paid = ?, payment_status = ?, updated_at = ? WHERE id = ?")
        .bind(reconciliation.total_paid.to_string())
        .bind(reconciliation.status.as_str())
        .bind(now_string())
        .bind(job_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

    Ok(())
}
