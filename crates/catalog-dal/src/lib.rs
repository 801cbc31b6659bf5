/// Operations shared by all repositories which only need the table and the
/// entity name. Expands inside the `impl` block of a repository.
macro_rules! record_ops {
    ($table:literal, $entity:literal) => {
        pub async fn count(&self) -> $crate::error::Result<u64> {
            let count: u64 = sqlx::query_scalar(concat!("SELECT count(*) FROM ", $table))
                .fetch_one(&self.executor)
                .await?;
            Ok(count)
        }

        pub async fn exists(&self, id: i64) -> $crate::error::Result<bool> {
            let found: Option<i64> =
                sqlx::query_scalar(concat!("SELECT id FROM ", $table, " WHERE id = ?"))
                    .bind(id)
                    .fetch_optional(&self.executor)
                    .await?;
            Ok(found.is_some())
        }

        pub async fn delete(&self, id: i64) -> $crate::error::Result<()> {
            let res = sqlx::query(concat!("DELETE FROM ", $table, " WHERE id = ?"))
                .bind(id)
                .execute(&self.executor)
                .await?;

            if res.rows_affected() == 0 {
                Err($crate::Error::RecordNotFound($entity.to_string()))
            } else {
                Ok(())
            }
        }
    };
}

pub mod author;
pub mod book;
pub mod book_instance;
pub mod dates;
pub mod error;
pub mod genre;

use std::str::FromStr as _;

pub use error::{Error, Result};
pub use sqlx::Error as SqlxError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

pub type ChosenDB = sqlx::Sqlite;
pub type ChosenRow = sqlx::sqlite::SqliteRow;
pub type Pool = sqlx::Pool<ChosenDB>;

pub async fn new_pool(database_url: &str) -> Result<Pool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(50)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// In-memory database with the schema applied.
///
/// Every connection to `sqlite::memory:` is a separate database, so the pool
/// is pinned to a single connection that is never recycled.
pub async fn new_memory_pool() -> Result<Pool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    migrate(&pool).await?;
    Ok(pool)
}

pub async fn migrate(pool: &Pool) -> Result<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

/// Builds a nested record from columns of a joined row, which carry a
/// type specific prefix (like `author_first_name`).
pub trait FromRowPrefixed: Sized {
    fn from_row_prefixed(row: &ChosenRow) -> Result<Self, sqlx::Error>;
}

/// Record with a canonical path in the catalog.
pub trait Resource {
    fn url(&self) -> String;
}
