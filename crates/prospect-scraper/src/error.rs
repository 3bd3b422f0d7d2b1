//! Error types for the scrape pipeline.

use prospect_db::DatabaseError;
use prospect_llm::LlmError;
use thiserror::Error;

/// Errors surfaced by the scrape trigger and pipeline setup.
///
/// Per-source fetch failures never show up here; they are recorded on the
/// `ScrapeResult` of that source.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Required configuration is missing or unusable
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The caller supplied an unusable request
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The target email list does not exist
    #[error("email list not found: {0}")]
    ListNotFound(String),

    /// Subscriber store failure
    #[error("store error: {0}")]
    Store(#[from] DatabaseError),

    /// Generative provider failure that could not be absorbed
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Http(String),

    /// Background run panicked or was aborted
    #[error("scrape task failed: {0}")]
    TaskJoin(String),
}

/// Result type alias for scrape operations.
pub type Result<T> = std::result::Result<T, ScrapeError>;
