//! Integration tests for legacy job import using the actual database backend.

use books_core::{BooksRepository, PaymentStatus, RepositoryError};
use books_data::{JobImportError, JobImporter};
use books_db_sqlite::SqliteRepository;
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use sqlx::sqlite::SqlitePoolOptions;

const TEST_CSV: &str = include_str!("../test-data/legacy_jobs.csv");

async fn setup_test_db() -> SqliteRepository {
    let pool = SqlitePoolOptions::new()
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    let repo = SqliteRepository::new_with_pool(pool).await;
    repo.run_migrations()
        .await
        .expect("Failed to run migrations");

    repo
}

#[tokio::test]
async fn test_import_all_legacy_jobs() {
    let repo = setup_test_db().await;

    let records = JobImporter::parse(TEST_CSV.as_bytes()).expect("Failed to parse CSV");
    let imported = JobImporter::import(&repo, "u1", &records)
        .await
        .expect("Failed to import jobs");

    assert_eq!(imported, 5);

    let jobs = repo.list_jobs("u1", None).await.expect("Failed to list");
    assert_eq!(jobs.len(), 5);
}

#[tokio::test]
async fn test_imported_jobs_start_unpaid_and_unnumbered() {
    let repo = setup_test_db().await;

    let records = JobImporter::parse(TEST_CSV.as_bytes()).expect("Failed to parse CSV");
    JobImporter::import(&repo, "u1", &records)
        .await
        .expect("Failed to import jobs");

    let jobs = repo.list_jobs("u1", None).await.expect("Failed to list");
    for job in &jobs {
        assert_eq!(job.payment_status, PaymentStatus::Unpaid);
        assert_eq!(job.amount_paid, dec!(0));
        assert_eq!(job.invoice_number, None);
        assert_eq!(job.due_date, None);
    }
}

#[tokio::test]
async fn test_import_derives_fiscal_year_labels() {
    let repo = setup_test_db().await;

    let records = JobImporter::parse(TEST_CSV.as_bytes()).expect("Failed to parse CSV");
    JobImporter::import(&repo, "u1", &records)
        .await
        .expect("Failed to import jobs");

    // 2025-06-01, 2025-05-12, and 2025-07-03 fall in 2025/2026.
    let current = repo
        .list_jobs("u1", Some("2025/2026"))
        .await
        .expect("Failed to list");
    assert_eq!(current.len(), 3);

    // 2025-04-05 (last day of the year) and 2024-11-20 fall in 2024/2025.
    let prior = repo
        .list_jobs("u1", Some("2024/2025"))
        .await
        .expect("Failed to list");
    assert_eq!(prior.len(), 2);
}

#[tokio::test]
async fn test_import_preserves_amounts_and_terms() {
    let repo = setup_test_db().await;

    let records = JobImporter::parse(TEST_CSV.as_bytes()).expect("Failed to parse CSV");
    JobImporter::import(&repo, "u1", &records)
        .await
        .expect("Failed to import jobs");

    let jobs = repo.list_jobs("u1", None).await.expect("Failed to list");
    let bathroom = jobs
        .iter()
        .find(|j| j.job_type == "Bathroom Installation")
        .expect("Should have imported the bathroom job");

    assert_eq!(bathroom.amount_invoiced, dec!(2400.00));
    assert_eq!(bathroom.payment_terms_days, Some(14));
    assert_eq!(bathroom.customer_name.as_deref(), Some("Mrs Hughes"));

    let repairs = jobs
        .iter()
        .find(|j| j.job_type == "General Repairs")
        .expect("Should have imported the repairs job");

    assert_eq!(repairs.amount_invoiced, dec!(275.50));
    assert_eq!(repairs.payment_terms_days, None);
    assert_eq!(repairs.customer_name, None);
}

#[tokio::test]
async fn test_import_stops_at_first_invalid_record() {
    let repo = setup_test_db().await;

    let csv = "job_date,property_address,job_type,customer_name,customer_phone,customer_email,description,amount_invoiced,payment_terms_days,completion_date,notes\n\
               2025-06-01,12 Acacia Avenue,Plastering,,,,,350.00,,,\n\
               2025-06-02,4 Mill Lane,Plastering,,,,,-10.00,,,\n\
               2025-06-03,9 High Street,Plastering,,,,,120.00,,,";
    let records = JobImporter::parse(csv.as_bytes()).expect("Failed to parse CSV");

    let result = JobImporter::import(&repo, "u1", &records).await;

    assert!(matches!(
        result,
        Err(JobImportError::Repository(RepositoryError::Invalid(_)))
    ));

    // Records before the bad one have been written; the rest have not.
    let jobs = repo.list_jobs("u1", None).await.expect("Failed to list");
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].property_address, "12 Acacia Avenue");
}
