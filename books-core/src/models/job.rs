use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::payment::PaymentStatus;

/// Lifecycle state of a job, independent of its payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JobStatus {
    #[default]
    Active,
    Completed,
    Archived,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

/// A job for a customer, carrying its invoice fields once one has been
/// generated.
///
/// `invoice_number` is assigned at most once and is stable for the job's
/// lifetime; numbers are unique per user per calendar year. `amount_paid`
/// and `payment_status` are caches of the latest reconciliation and are
/// only ever written together with the payment change that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    pub user_id: String,

    // Job details
    pub property_address: String,
    pub job_type: String,
    pub description: Option<String>,

    // Customer info
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,

    // Financial
    pub amount_invoiced: Decimal,
    pub amount_paid: Decimal,
    pub payment_status: PaymentStatus,

    // Invoicing
    pub invoice_number: Option<String>,
    pub payment_terms_days: Option<u32>,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,

    // Dates
    pub job_date: NaiveDate,
    pub completion_date: Option<NaiveDate>,

    /// Fiscal-year label the job falls in, e.g. `"2024/2025"`.
    pub tax_year: String,

    pub status: JobStatus,
    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// For creating new jobs (no id, timestamps, or derived invoice fields).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewJob {
    pub user_id: String,
    pub property_address: String,
    pub job_type: String,
    pub description: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub amount_invoiced: Decimal,
    pub payment_terms_days: Option<u32>,
    pub job_date: NaiveDate,
    pub completion_date: Option<NaiveDate>,
    pub notes: Option<String>,
}
