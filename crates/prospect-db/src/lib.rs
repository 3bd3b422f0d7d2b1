//! Prospect Database Layer
//!
//! `SQLite` storage for email lists and their subscribers, using `SQLx` with
//! embedded migrations.
//!
//! # Example
//!
//! ```ignore
//! use prospect_db::Database;
//!
//! let db = Database::new("prospect.db").await?;
//! db.run_migrations().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod connection;
pub mod email_lists;
pub mod error;
pub mod migrations;
pub mod subscribers;

pub use connection::ConnectionPool;
pub use email_lists::EmailList;
pub use error::{DatabaseError, Result};
pub use subscribers::{NewSubscriber, SubscriberRecord};

use std::path::Path;

/// High-level database handle.
///
/// Cloning is cheap; clones share the same pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: ConnectionPool,
}

impl Database {
    /// Open the database at `path` (or `:memory:`).
    ///
    /// # Errors
    /// Returns `DatabaseError::Open` if the database cannot be opened.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let pool = ConnectionPool::new(path).await?;
        Ok(Self { pool })
    }

    /// Wrap an existing connection pool.
    #[must_use]
    pub fn from_connection_pool(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    /// Open the database and bring the schema up to date.
    ///
    /// # Errors
    /// Returns `DatabaseError` if opening or migrating fails.
    pub async fn open_and_migrate(path: impl AsRef<Path>) -> Result<Self> {
        let db = Self::new(path).await?;
        db.run_migrations().await?;
        Ok(db)
    }

    /// Run all pending database migrations.
    ///
    /// # Errors
    /// Returns `DatabaseError::Migration` if any migration fails.
    pub async fn run_migrations(&self) -> Result<()> {
        migrations::run_migrations(self.pool.pool()).await
    }

    /// Get the current schema version.
    ///
    /// # Errors
    /// Returns `DatabaseError` if the version cannot be queried.
    pub async fn get_schema_version(&self) -> Result<i64> {
        migrations::get_schema_version(self.pool.pool()).await
    }

    /// Get a reference to the underlying `SQLx` pool.
    #[must_use]
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Sqlite> {
        self.pool.pool()
    }

    /// Close the database connection gracefully.
    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_database_creation() {
        let db = Database::new(":memory:").await.expect("create database");
        assert_eq!(db.get_schema_version().await.expect("version"), 0);
    }

    #[tokio::test]
    async fn test_database_schema() {
        let db = Database::open_and_migrate(":memory:")
            .await
            .expect("create database");

        let columns: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM pragma_table_info('email_subscribers') ORDER BY cid",
        )
        .fetch_all(db.pool())
        .await
        .expect("query columns");

        assert_eq!(
            columns,
            vec![
                "id",
                "email_list_id",
                "email",
                "status",
                "source",
                "metadata",
                "created_at"
            ]
        );
    }

    #[tokio::test]
    async fn test_database_close() {
        let db = Database::new(":memory:").await.expect("create database");
        db.close().await;
    }
}
