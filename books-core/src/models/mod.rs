mod fiscal_year;
mod job;
mod mileage;
mod payment;
mod receipt;
mod summary;

pub use fiscal_year::{FiscalYear, ParseError};
pub use job::{Job, JobStatus, NewJob};
pub use mileage::{MileageEntry, NewMileageEntry};
pub use payment::{NewPayment, Payment, PaymentMethod, PaymentStatus};
pub use receipt::{NewReceipt, Receipt, ReceiptCategory};
pub use summary::TaxYearSummary;
