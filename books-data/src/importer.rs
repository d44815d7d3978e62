use std::io::Read;

use books_core::{BooksRepository, NewJob, RepositoryError};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when importing legacy job data.
#[derive(Debug, Error)]
pub enum JobImportError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<csv::Error> for JobImportError {
    fn from(err: csv::Error) -> Self {
        JobImportError::CsvParse(err.to_string())
    }
}

/// A single record from a legacy jobs CSV export.
///
/// Expected columns:
/// - `job_date`: ISO date the work was done (e.g., 2025-06-01)
/// - `property_address`: where the work was carried out
/// - `job_type`: free-text job category (e.g., "Bathroom Installation")
/// - `customer_name`: optional customer name
/// - `customer_phone`: optional phone number
/// - `customer_email`: optional email address
/// - `description`: optional description of the work
/// - `amount_invoiced`: gross total for the job
/// - `payment_terms_days`: optional payment terms (empty for the 30-day default)
/// - `completion_date`: optional ISO completion date (empty if ongoing)
/// - `notes`: optional free-text notes
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct JobRecord {
    pub job_date: NaiveDate,
    pub property_address: String,
    pub job_type: String,
    #[serde(deserialize_with = "deserialize_optional_string")]
    pub customer_name: Option<String>,
    #[serde(deserialize_with = "deserialize_optional_string")]
    pub customer_phone: Option<String>,
    #[serde(deserialize_with = "deserialize_optional_string")]
    pub customer_email: Option<String>,
    #[serde(deserialize_with = "deserialize_optional_string")]
    pub description: Option<String>,
    pub amount_invoiced: Decimal,
    pub payment_terms_days: Option<u32>,
    #[serde(deserialize_with = "deserialize_optional_date")]
    pub completion_date: Option<NaiveDate>,
    #[serde(deserialize_with = "deserialize_optional_string")]
    pub notes: Option<String>,
}

fn deserialize_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        other => Ok(other),
    }
}

fn deserialize_optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// Importer for legacy job data from CSV exports.
///
/// The importer reads CSV data and creates jobs via the `BooksRepository`
/// trait, allowing it to work with any database backend. Each imported job
/// gets its fiscal-year label derived from `job_date` and starts unpaid with
/// no invoice number, exactly as if it had been entered by hand.
pub struct JobImporter;

impl JobImporter {
    /// Parse job records from a CSV reader.
    ///
    /// Returns a vector of parsed records. The reader can be any type that
    /// implements `Read`, such as a file or a string slice.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<JobRecord>, JobImportError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: JobRecord = result?;
            records.push(record);
        }

        Ok(records)
    }

    /// Create a job for each record, all owned by `user_id`.
    ///
    /// Returns the number of jobs created. The import stops at the first
    /// failing record; records before it have already been written.
    pub async fn import<R: BooksRepository>(
        repo: &R,
        user_id: &str,
        records: &[JobRecord],
    ) -> Result<usize, JobImportError> {
        let mut imported = 0;

        for record in records {
            let job = NewJob {
                user_id: user_id.to_string(),
                property_address: record.property_address.clone(),
                job_type: record.job_type.clone(),
                description: record.description.clone(),
                customer_name: record.customer_name.clone(),
                customer_phone: record.customer_phone.clone(),
                customer_email: record.customer_email.clone(),
                amount_invoiced: record.amount_invoiced,
                payment_terms_days: record.payment_terms_days,
                job_date: record.job_date,
                completion_date: record.completion_date,
                notes: record.notes.clone(),
            };

            repo.create_job(job).await?;
            imported += 1;
        }

        Ok(imported)
    }
}
