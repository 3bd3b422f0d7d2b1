//! Subscriber record operations.
//!
//! Records are unique per `(email_list_id, email)`. A second insert of the
//! same pair fails with `DatabaseError::DuplicateKey`.

use crate::error::{DatabaseError, Result};
use chrono::{DateTime, Utc};
use prospect_core::{ListId, SubscriberStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::{Pool, Row, Sqlite};

/// A persisted subscriber.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriberRecord {
    /// Unique identifier
    pub id: String,
    /// Owning list
    pub email_list_id: String,
    /// Email address as stored
    pub email: String,
    /// Subscription status
    pub status: SubscriberStatus,
    /// Where the address came from, e.g. `scraped_https://...`
    pub source: String,
    /// Free-form JSON metadata
    pub metadata: JsonValue,
    /// When the record was created
    pub created_at: DateTime<Utc>,
}

/// Fields required to insert a subscriber.
#[derive(Debug, Clone)]
pub struct NewSubscriber {
    /// Target list
    pub email_list_id: ListId,
    /// Email address
    pub email: String,
    /// Initial status
    pub status: SubscriberStatus,
    /// Origin label
    pub source: String,
    /// JSON metadata
    pub metadata: JsonValue,
}

/// Insert a subscriber.
///
/// # Errors
/// Returns `DatabaseError::DuplicateKey` when the email is already on the
/// list, `DatabaseError::Sqlx` for any other failure (including a missing list).
pub async fn create_subscriber(
    pool: &Pool<Sqlite>,
    subscriber: NewSubscriber,
) -> Result<SubscriberRecord> {
    let id = uuid::Uuid::new_v4().to_string();
    let created_at = Utc::now();
    let metadata_json = serde_json::to_string(&subscriber.metadata)
        .map_err(|e| DatabaseError::Query(format!("unserializable metadata: {e}")))?;

    sqlx::query(
        "INSERT INTO email_subscribers (id, email_list_id, email, status, source, metadata, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(subscriber.email_list_id.as_str())
    .bind(&subscriber.email)
    .bind(subscriber.status.as_str())
    .bind(&subscriber.source)
    .bind(&metadata_json)
    .bind(created_at.to_rfc3339())
    .execute(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => DatabaseError::DuplicateKey(
            format!(
                "{} already on list {}",
                subscriber.email, subscriber.email_list_id
            ),
        ),
        other => DatabaseError::Sqlx(other),
    })?;

    Ok(SubscriberRecord {
        id,
        email_list_id: subscriber.email_list_id.as_str().to_string(),
        email: subscriber.email,
        status: subscriber.status,
        source: subscriber.source,
        metadata: subscriber.metadata,
        created_at,
    })
}

/// Every email recorded for a list.
///
/// # Errors
/// Returns `DatabaseError::Sqlx` if the query fails.
pub async fn list_emails(pool: &Pool<Sqlite>, list_id: &ListId) -> Result<Vec<String>> {
    let emails = sqlx::query_scalar::<_, String>(
        "SELECT email FROM email_subscribers WHERE email_list_id = ? ORDER BY created_at",
    )
    .bind(list_id.as_str())
    .fetch_all(pool)
    .await?;

    Ok(emails)
}

/// Count subscribers on a list whose `source` starts with `prefix`.
///
/// Compared with `substr` rather than `LIKE` so `_` and `%` in the prefix
/// match literally.
///
/// # Errors
/// Returns `DatabaseError::Sqlx` if the query fails.
pub async fn count_with_source_prefix(
    pool: &Pool<Sqlite>,
    list_id: &ListId,
    prefix: &str,
) -> Result<u64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM email_subscribers
         WHERE email_list_id = ? AND substr(source, 1, length(?)) = ?",
    )
    .bind(list_id.as_str())
    .bind(prefix)
    .bind(prefix)
    .fetch_one(pool)
    .await?;

    u64::try_from(count).map_err(|e| DatabaseError::Decode(format!("negative count: {e}")))
}

/// All subscriber records of a list, oldest first.
///
/// # Errors
/// Returns `DatabaseError` if the query or row decoding fails.
pub async fn get_subscribers_by_list(
    pool: &Pool<Sqlite>,
    list_id: &ListId,
) -> Result<Vec<SubscriberRecord>> {
    let rows = sqlx::query(
        "SELECT id, email_list_id, email, status, source, metadata, created_at
         FROM email_subscribers WHERE email_list_id = ? ORDER BY created_at, id",
    )
    .bind(list_id.as_str())
    .fetch_all(pool)
    .await?;

    rows.iter().map(parse_subscriber).collect()
}

fn parse_subscriber(row: &sqlx::sqlite::SqliteRow) -> Result<SubscriberRecord> {
    let status_str: String = row.try_get("status")?;
    let status = status_str
        .parse::<SubscriberStatus>()
        .map_err(|e| DatabaseError::Decode(e.to_string()))?;

    let metadata_str: String = row.try_get("metadata")?;
    let metadata = serde_json::from_str(&metadata_str).unwrap_or(JsonValue::Null);

    let created_at_str: String = row.try_get("created_at")?;
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map_err(|e| DatabaseError::Decode(format!("invalid created_at '{created_at_str}': {e}")))?
        .with_timezone(&Utc);

    Ok(SubscriberRecord {
        id: row.try_get("id")?,
        email_list_id: row.try_get("email_list_id")?,
        email: row.try_get("email")?,
        status,
        source: row.try_get("source")?,
        metadata,
        created_at,
    })
}
