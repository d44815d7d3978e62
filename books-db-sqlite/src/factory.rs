use std::path::PathBuf;

use async_trait::async_trait;

use books_core::db::repository::{BooksRepository, RepositoryError};
use books_core::db::{DbConfig, RepositoryFactory};

use crate::repository::SqliteRepository;

/// Resolve the seeds directory at runtime so it works in both development and
/// packaged distribution.
///
/// Resolution order:
/// 1. **`BOOKS_DB_SQLITE_SEEDS_DIR`** — if set, use this path (override for
///    packagers or custom layouts).
/// 2. **`./seeds`** — if the directory exists in the current working directory.
/// 3. **Crate manifest dir** — `$CARGO_MANIFEST_DIR/seeds` as last resort
///    (dev/tests when run from the build tree).
fn seeds_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("BOOKS_DB_SQLITE_SEEDS_DIR") {
        return PathBuf::from(dir);
    }
    let cwd_seeds = PathBuf::from("./seeds");
    if cwd_seeds.is_dir() {
        return cwd_seeds;
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("seeds")
}

/// [`RepositoryFactory`] for SQLite.
///
/// Register this with a [`books_core::db::RepositoryRegistry`] to make the
/// `"sqlite"` backend available:
///
/// ```rust,no_run
/// use books_core::db::RepositoryRegistry;
/// use books_db_sqlite::SqliteRepositoryFactory;
///
/// let mut registry = RepositoryRegistry::new();
/// registry.register(Box::new(SqliteRepositoryFactory));
/// ```
pub struct SqliteRepositoryFactory;

#[async_trait]
impl RepositoryFactory for SqliteRepositoryFactory {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    /// Open the database described by `config.connection_string`, run
    /// migrations, and load the pick-list seeds.
    ///
    /// Accepted connection-string values are anything sqlx's SQLite driver
    /// takes, e.g. `"sqlite:books.db?mode=rwc"` or `"sqlite::memory:"`.
    ///
    /// Seed SQL files are loaded from a directory resolved at runtime (see
    /// [`seeds_dir`]). For packaged distribution, set
    /// `BOOKS_DB_SQLITE_SEEDS_DIR` or run with a `seeds` directory in the
    /// current working directory.
    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn BooksRepository>, RepositoryError> {
        let repo = SqliteRepository::new(&config.connection_string).await?;
        repo.run_migrations().await?;
        repo.run_seeds(&seeds_dir()).await?;
        Ok(Box::new(repo))
    }
}

#[cfg(test)]
mod tests {
    use books_core::db::DbConfig;

    use super::SqliteRepositoryFactory;
    use books_core::db::RepositoryFactory;

    #[test]
    fn backend_name_is_sqlite() {
        assert_eq!(SqliteRepositoryFactory.backend_name(), "sqlite");
    }

    /// Full round-trip: factory → SqliteRepository with an in-memory DB.
    /// Requires that migrations and seeds are discoverable from the test's
    /// working directory.  Run from the workspace root:
    ///   cargo test -p books-db-sqlite
    #[tokio::test]
    async fn creates_in_memory_repository() {
        let config = DbConfig {
            backend: "sqlite".to_string(),
            connection_string: "sqlite::memory:".to_string(),
        };

        let result = SqliteRepositoryFactory.create(&config).await;
        assert!(
            result.is_ok(),
            "failed to create in-memory repository: {:#?}",
            result.err()
        );
    }
}
