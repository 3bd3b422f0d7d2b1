//! Scrape orchestrator.
//!
//! Sources are processed in batches of at most `concurrency` fetches. Each
//! batch runs as spawned tasks and is fully drained before the next batch is
//! dispatched. Finished results go to the sink in completion order.

use crate::fetcher::SourceFetch;
use crate::rate_limit::{Clock, TokioClock};
use crate::sink::{Progress, ResultSink};
use futures::stream::{FuturesUnordered, StreamExt};
use prospect_core::{ScrapeResult, ScrapeSource, ScrapingConfig};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Lifecycle of a scrape run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum ScrapeState {
    /// Sources are ranked; loading the list's known emails
    Starting,
    /// Fetching batch `batch` (1-based) of `batches`
    Fetching {
        /// Current batch
        batch: usize,
        /// Number of batches in the run
        batches: usize,
    },
    /// Every source was processed
    Completed,
    /// Stopped early because enough emails were stored
    Saturated,
    /// Stopped early by the caller
    Cancelled,
    /// Aborted before fetching; the error is returned by the run
    Failed,
}

impl ScrapeState {
    /// Whether the run has finished.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Saturated | Self::Cancelled | Self::Failed
        )
    }
}

/// Drives fetching of ranked sources.
pub struct ScrapeOrchestrator {
    fetcher: Arc<dyn SourceFetch>,
    concurrency: usize,
    batch_delay: Duration,
    clock: Arc<dyn Clock>,
}

impl ScrapeOrchestrator {
    /// Create an orchestrator with the default cap (5) and delay (2 s).
    #[must_use]
    pub fn new(fetcher: Arc<dyn SourceFetch>) -> Self {
        Self::from_config(fetcher, &ScrapingConfig::default())
    }

    /// Create an orchestrator from the `[scraping]` section.
    #[must_use]
    pub fn from_config(fetcher: Arc<dyn SourceFetch>, config: &ScrapingConfig) -> Self {
        Self {
            fetcher,
            concurrency: config.concurrency.max(1),
            batch_delay: Duration::from_millis(config.request_delay_ms),
            clock: Arc::new(TokioClock),
        }
    }

    /// Set the maximum number of fetches per batch.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Set the pause between batches.
    #[must_use]
    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay = delay;
        self
    }

    /// Use a specific clock for the pause between batches.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Fetch every source, feeding results to `sink` until `cancel` fires.
    ///
    /// Returns the results of every fetch that ran, including those that
    /// finished after cancellation and were not given to the sink.
    pub async fn run<S>(
        &self,
        sources: &[ScrapeSource],
        sink: &mut S,
        cancel: &CancellationToken,
        state: Option<&watch::Sender<ScrapeState>>,
    ) -> Vec<ScrapeResult>
    where
        S: ResultSink + ?Sized,
    {
        let total = sources.len();
        let batches = total.div_ceil(self.concurrency);
        let mut results = Vec::with_capacity(total);
        let mut processed = 0;

        tracing::info!(
            "Scraping {} sources in {} batches of up to {}",
            total,
            batches,
            self.concurrency
        );

        for (index, batch) in sources.chunks(self.concurrency).enumerate() {
            if cancel.is_cancelled() {
                tracing::info!("Scrape cancelled before batch {}/{}", index + 1, batches);
                break;
            }

            if let Some(state) = state {
                state.send_replace(ScrapeState::Fetching {
                    batch: index + 1,
                    batches,
                });
            }

            let mut in_flight = FuturesUnordered::new();
            for source in batch {
                in_flight.push(self.spawn_fetch(source));
            }

            while let Some(result) = in_flight.next().await {
                processed += 1;
                if !cancel.is_cancelled() {
                    let progress = Progress { total, processed };
                    if let Err(e) = sink.accept(&result, progress).await {
                        tracing::error!("Result sink failed for {}: {}", result.source_url, e);
                    }
                }
                results.push(result);
            }

            let is_last = index + 1 == batches;
            if !is_last && !cancel.is_cancelled() {
                tokio::select! {
                    () = cancel.cancelled() => {}
                    () = self.clock.sleep(self.batch_delay) => {}
                }
            }
        }

        let succeeded = results.iter().filter(|r| r.succeeded).count();
        tracing::info!(
            "Scrape finished: {}/{} sources fetched, {} succeeded",
            results.len(),
            total,
            succeeded
        );

        results
    }

    fn spawn_fetch(
        &self,
        source: &ScrapeSource,
    ) -> impl std::future::Future<Output = ScrapeResult> {
        let fetcher = Arc::clone(&self.fetcher);
        let url = source.url.clone();
        let kind = source.kind;
        let task = tokio::spawn(async move { fetcher.fetch(&url, kind).await });

        let url = source.url.clone();
        async move {
            task.await.unwrap_or_else(|e| {
                tracing::error!("Fetch task for {} failed: {}", url, e);
                ScrapeResult::failure(url, format!("fetch task failed: {e}"))
            })
        }
    }
}
