//! Email list operations.
//!
//! Lists are the containers subscribers are scraped into. The pipeline only
//! reads them; creation exists for the CLI and for tests.

use crate::error::{DatabaseError, Result};
use chrono::{DateTime, Utc};
use prospect_core::ListId;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Row, Sqlite};

/// An email list row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailList {
    /// List identifier
    pub id: String,
    /// Human readable name
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// When the list was created
    pub created_at: DateTime<Utc>,
}

/// Create a new email list with the given identifier.
///
/// # Errors
/// Returns `DatabaseError::DuplicateKey` if the ID is taken, or
/// `DatabaseError::Sqlx` if the insert fails.
pub async fn create_email_list(
    pool: &Pool<Sqlite>,
    id: &ListId,
    name: impl Into<String>,
    description: Option<String>,
) -> Result<EmailList> {
    let name = name.into();
    let created_at = Utc::now();

    sqlx::query(
        "INSERT INTO email_lists (id, name, description, created_at)
         VALUES (?, ?, ?, ?)",
    )
    .bind(id.as_str())
    .bind(&name)
    .bind(&description)
    .bind(created_at.to_rfc3339())
    .execute(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            DatabaseError::DuplicateKey(format!("email list '{id}' already exists"))
        }
        other => DatabaseError::Sqlx(other),
    })?;

    tracing::debug!("Created email list {}", id);

    Ok(EmailList {
        id: id.as_str().to_string(),
        name,
        description,
        created_at,
    })
}

/// Fetch a single email list.
///
/// # Errors
/// Returns `DatabaseError::NotFound` if no list has this ID.
pub async fn get_email_list(pool: &Pool<Sqlite>, id: &ListId) -> Result<EmailList> {
    let row = sqlx::query(
        "SELECT id, name, description, created_at FROM email_lists WHERE id = ?",
    )
    .bind(id.as_str())
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound(format!("email list '{id}' not found")))?;

    parse_email_list(&row)
}

/// Whether a list with this ID exists.
///
/// # Errors
/// Returns `DatabaseError::Sqlx` if the query fails.
pub async fn email_list_exists(pool: &Pool<Sqlite>, id: &ListId) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM email_lists WHERE id = ?")
        .bind(id.as_str())
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

/// All email lists, oldest first.
///
/// # Errors
/// Returns `DatabaseError` if the query or row decoding fails.
pub async fn list_email_lists(pool: &Pool<Sqlite>) -> Result<Vec<EmailList>> {
    let rows = sqlx::query(
        "SELECT id, name, description, created_at FROM email_lists ORDER BY created_at, id",
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(parse_email_list).collect()
}

fn parse_email_list(row: &sqlx::sqlite::SqliteRow) -> Result<EmailList> {
    let created_at_str: String = row.try_get("created_at")?;
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map_err(|e| DatabaseError::Decode(format!("invalid created_at '{created_at_str}': {e}")))?
        .with_timezone(&Utc);

    Ok(EmailList {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn setup_test_db() -> Database {
        let db = Database::new(":memory:").await.expect("create database");
        db.run_migrations().await.expect("run migrations");
        db
    }

    #[tokio::test]
    async fn test_create_and_get_list() {
        let db = setup_test_db().await;
        let id = ListId::new("newsletter").expect("valid id");

        let created = create_email_list(db.pool(), &id, "Newsletter", Some("weekly".into()))
            .await
            .expect("create list");
        let fetched = get_email_list(db.pool(), &id).await.expect("get list");

        assert_eq!(fetched.id, "newsletter");
        assert_eq!(fetched.name, "Newsletter");
        assert_eq!(fetched.description.as_deref(), Some("weekly"));
        assert_eq!(fetched.created_at.timestamp(), created.created_at.timestamp());
    }

    #[tokio::test]
    async fn test_duplicate_list_rejected() {
        let db = setup_test_db().await;
        let id = ListId::new("dup").expect("valid id");

        create_email_list(db.pool(), &id, "First", None)
            .await
            .expect("create list");
        let err = create_email_list(db.pool(), &id, "Second", None)
            .await
            .expect_err("duplicate id");

        assert!(err.is_duplicate());
    }

    #[tokio::test]
    async fn test_exists_and_missing() {
        let db = setup_test_db().await;
        let id = ListId::new("present").expect("valid id");
        let missing = ListId::new("missing").expect("valid id");

        create_email_list(db.pool(), &id, "Present", None)
            .await
            .expect("create list");

        assert!(email_list_exists(db.pool(), &id).await.expect("exists"));
        assert!(!email_list_exists(db.pool(), &missing).await.expect("exists"));
        assert!(matches!(
            get_email_list(db.pool(), &missing).await,
            Err(DatabaseError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_email_lists() {
        let db = setup_test_db().await;
        for name in ["a", "b", "c"] {
            let id = ListId::new(name).expect("valid id");
            create_email_list(db.pool(), &id, name.to_uppercase(), None)
                .await
                .expect("create list");
        }

        let lists = list_email_lists(db.pool()).await.expect("list");
        assert_eq!(lists.len(), 3);
    }
}
