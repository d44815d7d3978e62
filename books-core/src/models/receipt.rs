use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Expense category for a receipt. Stored by its lowercase code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiptCategory {
    Materials,
    Subcontractor,
    Tools,
    Transport,
    Other,
}

impl ReceiptCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Materials => "materials",
            Self::Subcontractor => "subcontractor",
            Self::Tools => "tools",
            Self::Transport => "transport",
            Self::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "materials" => Some(Self::Materials),
            "subcontractor" => Some(Self::Subcontractor),
            "tools" => Some(Self::Tools),
            "transport" => Some(Self::Transport),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// An expense receipt logged against a job.
///
/// `amount` is the gross (VAT-inclusive) figure off the receipt;
/// `vat_amount` is the back-calculated VAT portion, computed on insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: i64,
    pub user_id: String,
    pub job_id: i64,
    pub receipt_date: NaiveDate,
    pub supplier: String,
    pub amount: Decimal,
    pub vat_amount: Decimal,
    pub category: ReceiptCategory,
    pub items_description: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// For logging new receipts (VAT portion is computed on insert).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReceipt {
    pub user_id: String,
    pub job_id: i64,
    pub receipt_date: NaiveDate,
    pub supplier: String,
    pub amount: Decimal,
    pub category: ReceiptCategory,
    pub items_description: Option<String>,
    pub notes: Option<String>,
}
