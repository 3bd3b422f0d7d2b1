//! Shared types used across the Prospect pipeline.
//!
//! These are the values that flow between the ranker, the fetcher, the
//! orchestrator and the subscriber store.

use crate::error::ProspectError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Newtype for email list identifiers.
///
/// List IDs are 1-64 characters of ASCII alphanumerics, `-` or `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListId(String);

impl ListId {
    /// Create a new `ListId` from a string.
    ///
    /// # Errors
    /// Returns error if the ID is empty, too long or contains other characters.
    pub fn new(id: impl Into<String>) -> Result<Self, ProspectError> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    /// Create a new random `ListId`.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(id: &str) -> Result<(), ProspectError> {
        static LIST_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex =
            LIST_REGEX.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("valid regex"));

        if regex.is_match(id) {
            Ok(())
        } else {
            Err(ProspectError::Validation(format!(
                "invalid list ID: must be 1-64 alphanumeric, '-' or '_' characters, got '{id}'"
            )))
        }
    }
}

impl fmt::Display for ListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of location a scrape source points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Company or personal website
    #[default]
    Website,
    /// Business or professional directory
    Directory,
    /// Forum or community board
    Forum,
    /// Social network
    Social,
    /// Job board
    JobBoard,
}

impl SourceKind {
    /// Wire label of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Website => "website",
            Self::Directory => "directory",
            Self::Forum => "forum",
            Self::Social => "social",
            Self::JobBoard => "job_board",
        }
    }

    /// Parse a label, returning `None` for anything unrecognised.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "website" => Some(Self::Website),
            "directory" => Some(Self::Directory),
            "forum" => Some(Self::Forum),
            "social" => Some(Self::Social),
            "job_board" => Some(Self::JobBoard),
            _ => None,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A location that is likely to contain addresses of the target audience.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeSource {
    /// Absolute URL to fetch
    pub url: String,
    /// What kind of page this is
    #[serde(rename = "type")]
    pub kind: SourceKind,
    /// Processing priority, 1-10 (10 = first)
    pub priority: u8,
    /// Why the source was chosen
    pub description: String,
}

impl ScrapeSource {
    /// Lowest allowed priority.
    pub const MIN_PRIORITY: u8 = 1;
    /// Highest allowed priority.
    pub const MAX_PRIORITY: u8 = 10;

    /// Create a source, clamping the priority into 1-10.
    #[must_use]
    pub fn new(
        url: impl Into<String>,
        kind: SourceKind,
        priority: u8,
        description: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            kind,
            priority: priority.clamp(Self::MIN_PRIORITY, Self::MAX_PRIORITY),
            description: description.into(),
        }
    }
}

/// Outcome of fetching a single source.
///
/// Produced once per source per fetch attempt and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeResult {
    /// URL that was fetched
    pub source_url: String,
    /// Lowercase addresses found, unique within this result
    pub emails: BTreeSet<String>,
    /// Whether the fetch itself succeeded
    pub succeeded: bool,
    /// Failure description when `succeeded` is false
    pub error_message: Option<String>,
}

impl ScrapeResult {
    /// Successful fetch carrying the extracted addresses.
    #[must_use]
    pub fn success(source_url: impl Into<String>, emails: BTreeSet<String>) -> Self {
        Self {
            source_url: source_url.into(),
            emails,
            succeeded: true,
            error_message: None,
        }
    }

    /// Failed fetch with a description of the cause.
    #[must_use]
    pub fn failure(source_url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            emails: BTreeSet::new(),
            succeeded: false,
            error_message: Some(message.into()),
        }
    }
}

/// Lifecycle state of a subscriber record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriberStatus {
    /// Awaiting double opt-in
    Pending,
    /// Confirmed
    Subscribed,
    /// Opted out
    Unsubscribed,
}

impl SubscriberStatus {
    /// Storage label of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Subscribed => "subscribed",
            Self::Unsubscribed => "unsubscribed",
        }
    }
}

impl fmt::Display for SubscriberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriberStatus {
    type Err = ProspectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "subscribed" => Ok(Self::Subscribed),
            "unsubscribed" => Ok(Self::Unsubscribed),
            other => Err(ProspectError::Validation(format!(
                "unknown subscriber status '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_id_valid() {
        for id in ["clx9a8b7c0000abcd", "list-1", "my_list", "a"] {
            assert!(ListId::new(id).is_ok(), "Failed for: {id}");
        }
    }

    #[test]
    fn test_list_id_invalid() {
        let too_long = "a".repeat(65);
        for id in ["", "has space", "semi;colon", too_long.as_str()] {
            assert!(ListId::new(id).is_err(), "Should fail for: {id}");
        }
    }

    #[test]
    fn test_list_id_generate_is_valid() {
        let id = ListId::generate();
        assert!(ListId::new(id.as_str()).is_ok());
        assert_eq!(id.as_str().len(), 32);
    }

    #[test]
    fn test_source_kind_labels() {
        assert_eq!(SourceKind::from_label("job_board"), Some(SourceKind::JobBoard));
        assert_eq!(SourceKind::from_label(" Forum "), Some(SourceKind::Forum));
        assert_eq!(SourceKind::from_label("blog"), None);
        assert_eq!(SourceKind::default(), SourceKind::Website);
    }

    #[test]
    fn test_source_priority_clamped() {
        assert_eq!(ScrapeSource::new("https://a.pl", SourceKind::Website, 0, "").priority, 1);
        assert_eq!(ScrapeSource::new("https://a.pl", SourceKind::Website, 42, "").priority, 10);
    }

    #[test]
    fn test_source_serialization_uses_type_key() {
        let source = ScrapeSource::new("https://www.pkt.pl", SourceKind::JobBoard, 5, "PKT");
        let json = serde_json::to_value(&source).expect("serialize source");
        assert_eq!(json["type"], "job_board");
        assert_eq!(json["priority"], 5);
    }

    #[test]
    fn test_scrape_result_constructors() {
        let failed = ScrapeResult::failure("https://a.pl", "HTTP 404 Not Found");
        assert!(!failed.succeeded);
        assert!(failed.emails.is_empty());
        assert_eq!(failed.error_message.as_deref(), Some("HTTP 404 Not Found"));

        let emails: BTreeSet<String> = ["jan@example.com".to_string()].into_iter().collect();
        let ok = ScrapeResult::success("https://a.pl", emails);
        assert!(ok.succeeded);
        assert!(ok.error_message.is_none());
    }

    #[test]
    fn test_subscriber_status_round_trip() {
        for status in [
            SubscriberStatus::Pending,
            SubscriberStatus::Subscribed,
            SubscriberStatus::Unsubscribed,
        ] {
            assert_eq!(status.as_str().parse::<SubscriberStatus>().ok(), Some(status));
        }
        assert!("bounced".parse::<SubscriberStatus>().is_err());
    }
}
