pub mod calculations;
pub mod db;
pub mod models;

pub use db::repository::{BooksRepository, RepositoryError};
pub use models::*;
