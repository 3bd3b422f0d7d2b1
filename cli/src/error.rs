//! Error type for CLI commands.

use prospect_core::{ConfigError, ProspectError};
use prospect_db::DatabaseError;
use prospect_scraper::ScrapeError;
use serde::Serialize;
use thiserror::Error;

/// Serializable command error, printed as JSON in `--json` mode.
#[derive(Debug, Error, Serialize)]
#[error("{message}")]
pub struct CommandError {
    /// Stable error code for scripts (e.g., "LIST_NOT_FOUND")
    pub code: String,
    /// User-friendly error message
    pub message: String,
    /// Optional debugging context
    pub details: Option<serde_json::Value>,
}

impl CommandError {
    /// Create a new command error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Create a command error with details.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details),
        }
    }
}

impl From<ScrapeError> for CommandError {
    fn from(err: ScrapeError) -> Self {
        match err {
            ScrapeError::Configuration(msg) => {
                Self::new("CONFIGURATION_ERROR", format!("Configuration error: {msg}"))
            }
            ScrapeError::InvalidRequest(msg) => {
                Self::new("INVALID_REQUEST", format!("Invalid request: {msg}"))
            }
            ScrapeError::ListNotFound(id) => Self::with_details(
                "LIST_NOT_FOUND",
                "Email list does not exist",
                serde_json::json!({ "list_id": id }),
            ),
            ScrapeError::Store(err) => err.into(),
            ScrapeError::Llm(err) => Self::new("LLM_ERROR", format!("LLM error: {err}")),
            ScrapeError::Http(msg) => Self::new("HTTP_ERROR", format!("HTTP error: {msg}")),
            ScrapeError::TaskJoin(msg) => {
                Self::new("TASK_JOIN_ERROR", format!("Scrape task failed: {msg}"))
            }
        }
    }
}

impl From<DatabaseError> for CommandError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(what) => Self::new("NOT_FOUND", format!("Not found: {what}")),
            DatabaseError::DuplicateKey(what) => {
                Self::new("ALREADY_EXISTS", format!("Already exists: {what}"))
            }
            other => Self::new("DATABASE_ERROR", format!("Database error: {other}")),
        }
    }
}

impl From<ConfigError> for CommandError {
    fn from(err: ConfigError) -> Self {
        Self::new("CONFIGURATION_ERROR", format!("Configuration error: {err}"))
    }
}

impl From<ProspectError> for CommandError {
    fn from(err: ProspectError) -> Self {
        match err {
            ProspectError::Validation(msg) => {
                Self::new("INVALID_REQUEST", format!("Invalid request: {msg}"))
            }
            ProspectError::Config(err) => err.into(),
            other => Self::new("INTERNAL_ERROR", other.to_string()),
        }
    }
}
