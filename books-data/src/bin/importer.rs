use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use books_data::JobImporter;
use books_db_sqlite::SqliteRepository;
use clap::Parser;

/// Import legacy job data from a CSV file into the database.
///
/// The CSV file should have the following columns:
/// - job_date: ISO date the work was done (e.g., 2025-06-01)
/// - property_address: where the work was carried out
/// - job_type: job category (e.g., "Bathroom Installation")
/// - customer_name, customer_phone, customer_email: optional customer details
/// - description: optional description of the work
/// - amount_invoiced: gross total for the job
/// - payment_terms_days: optional payment terms (empty for the 30-day default)
/// - completion_date: optional ISO completion date
/// - notes: optional free-text notes
#[derive(Parser, Debug)]
#[command(name = "books-data-importer")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the CSV file containing legacy job data
    #[arg(short, long)]
    file: PathBuf,

    /// User the imported jobs belong to
    #[arg(short, long)]
    user: String,

    /// SQLite database URL (e.g., sqlite:books.db?mode=rwc to create if missing)
    #[arg(short, long, default_value = "sqlite:books.db?mode=rwc")]
    database: String,

    /// Run database migrations before importing data
    #[arg(short, long, default_value_t = false)]
    migrate: bool,

    /// Run seed files from the specified directory after migrations
    #[arg(short, long)]
    seeds: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let repo = SqliteRepository::new(&args.database)
        .await
        .with_context(|| format!("Failed to connect to database: {}", args.database))?;

    if args.migrate {
        println!("Running migrations...");
        repo.run_migrations()
            .await
            .context("Failed to run migrations")?;
        println!("Migrations complete.");
    }

    if let Some(seeds_dir) = &args.seeds {
        println!("Running seeds from: {}", seeds_dir.display());
        repo.run_seeds(seeds_dir)
            .await
            .with_context(|| format!("Failed to run seeds from: {}", seeds_dir.display()))?;
        println!("Seeds complete.");
    }

    println!("Importing jobs from: {}", args.file.display());

    let file = File::open(&args.file)
        .with_context(|| format!("Failed to open: {}", args.file.display()))?;

    let records = JobImporter::parse(file)
        .with_context(|| format!("Failed to parse CSV: {}", args.file.display()))?;

    println!("Parsed {} records from CSV", records.len());

    let imported = JobImporter::import(&repo, &args.user, &records)
        .await
        .context("Failed to import jobs into database")?;

    println!("Successfully imported {} jobs for {}.", imported, args.user);

    Ok(())
}
