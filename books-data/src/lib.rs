pub mod importer;

pub use importer::{JobImportError, JobImporter, JobRecord};
