use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A business trip logged against a job.
///
/// `deduction` is the HMRC-tiered amount computed when the entry was
/// recorded, from the trip's miles and the fiscal-year mileage already on
/// the books at that point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MileageEntry {
    pub id: i64,
    pub user_id: String,
    pub job_id: i64,
    pub trip_date: NaiveDate,
    pub from_location: String,
    pub to_location: String,
    pub miles: Decimal,
    pub deduction: Decimal,
    pub purpose: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// For logging new trips (deduction is computed on insert).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMileageEntry {
    pub user_id: String,
    pub job_id: i64,
    pub trip_date: NaiveDate,
    pub from_location: String,
    pub to_location: String,
    pub miles: Decimal,
    pub purpose: Option<String>,
    pub notes: Option<String>,
}
