//! Result consumers.
//!
//! The orchestrator hands every finished fetch to a [`ResultSink`]. The
//! [`SubscriberSink`] dedupes addresses against the list, stores new ones as
//! pending subscribers, and cancels the run once the wanted count is stored.

use crate::analysis::AudienceAnalysis;
use crate::error::Result;
use crate::extractor::is_valid_email;
use crate::store::SubscriberStore;
use async_trait::async_trait;
use prospect_core::{ListId, ScrapeResult, SubscriberStatus};
use prospect_db::NewSubscriber;
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Source label prefix of every scraped subscriber.
pub const SCRAPED_SOURCE_PREFIX: &str = "scraped_";

const PROGRESS_LOG_INTERVAL: usize = 100;

/// Position of a result within the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Number of sources in the run
    pub total: usize,
    /// Sources finished so far, this one included
    pub processed: usize,
}

/// Consumer of fetch results, called once per finished source.
#[async_trait]
pub trait ResultSink: Send {
    /// Handle one result.
    async fn accept(&mut self, result: &ScrapeResult, progress: Progress) -> Result<()>;
}

/// Counters kept by [`SubscriberSink`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SinkStats {
    /// Subscribers stored during the run
    pub saved: usize,
    /// Addresses skipped as already known
    pub duplicates: usize,
    /// Addresses rejected as malformed
    pub invalid: usize,
    /// Inserts that failed for other reasons
    pub failed_saves: usize,
}

/// Stores scraped addresses as pending subscribers of one list.
pub struct SubscriberSink {
    store: Arc<dyn SubscriberStore>,
    list_id: ListId,
    analysis: JsonValue,
    seen: HashSet<String>,
    min_count: usize,
    cancel: CancellationToken,
    stats: SinkStats,
}

impl SubscriberSink {
    /// Create a sink seeded with the emails already on the list.
    ///
    /// # Errors
    /// Returns `ScrapeError::Store` if existing emails cannot be read.
    pub async fn new(
        store: Arc<dyn SubscriberStore>,
        list_id: ListId,
        analysis: &AudienceAnalysis,
        min_count: usize,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let seen: HashSet<String> = store
            .list_emails(&list_id)
            .await?
            .into_iter()
            .map(|email| email.to_lowercase())
            .collect();

        tracing::debug!("List {} already holds {} emails", list_id, seen.len());

        Ok(Self {
            store,
            list_id,
            analysis: serde_json::to_value(analysis).unwrap_or(JsonValue::Null),
            seen,
            min_count,
            cancel,
            stats: SinkStats::default(),
        })
    }

    /// Counters so far.
    #[must_use]
    pub fn stats(&self) -> SinkStats {
        self.stats
    }

    /// Whether the wanted number of subscribers has been stored.
    #[must_use]
    pub fn is_saturated(&self) -> bool {
        self.stats.saved >= self.min_count
    }

    async fn save(&mut self, email: String, source_url: &str) {
        let subscriber = NewSubscriber {
            email_list_id: self.list_id.clone(),
            email: email.clone(),
            status: SubscriberStatus::Pending,
            source: format!("{SCRAPED_SOURCE_PREFIX}{source_url}"),
            metadata: json!({
                "analysis": self.analysis,
                "scrapedAt": chrono::Utc::now().to_rfc3339(),
            }),
        };

        match self.store.create(subscriber).await {
            Ok(()) => {
                self.seen.insert(email);
                self.stats.saved += 1;
                if self.stats.saved % PROGRESS_LOG_INTERVAL == 0 {
                    tracing::info!(
                        "Saved {} emails to list {}",
                        self.stats.saved,
                        self.list_id
                    );
                }
            }
            Err(e) if e.is_duplicate() => {
                self.seen.insert(email);
                self.stats.duplicates += 1;
            }
            Err(e) => {
                tracing::error!("Failed to save {} to list {}: {}", email, self.list_id, e);
                self.stats.failed_saves += 1;
            }
        }
    }
}

#[async_trait]
impl ResultSink for SubscriberSink {
    async fn accept(&mut self, result: &ScrapeResult, progress: Progress) -> Result<()> {
        tracing::debug!(
            "Processing {} ({}/{}), {} candidate emails",
            result.source_url,
            progress.processed,
            progress.total,
            result.emails.len()
        );

        for candidate in &result.emails {
            if self.is_saturated() {
                break;
            }

            let email = candidate.trim().to_lowercase();
            if self.seen.contains(&email) {
                self.stats.duplicates += 1;
                continue;
            }
            if !is_valid_email(&email) {
                self.stats.invalid += 1;
                continue;
            }

            self.save(email, &result.source_url).await;

            if self.is_saturated() {
                tracing::info!(
                    "Reached {} emails for list {}, stopping",
                    self.min_count,
                    self.list_id
                );
                self.cancel.cancel();
            }
        }

        Ok(())
    }
}
