//! Scrape trigger and status polling.
//!
//! `ScrapeService` ties the pieces together: it validates a request, runs
//! audience analysis and source ranking side by side, then drives the fetch
//! pipeline into the subscriber store either in the background
//! ([`ScrapeService::start_scrape`]) or inline ([`ScrapeService::run_scrape`]).

use crate::analysis::{AudienceAnalysis, AudienceAnalyzer};
use crate::error::{Result, ScrapeError};
use crate::fetcher::{HttpFetcher, SourceFetch};
use crate::orchestrator::{ScrapeOrchestrator, ScrapeState};
use crate::rate_limit::{Clock, RateLimiter, TokioClock};
use crate::ranker::SourceRanker;
use crate::sink::{SinkStats, SubscriberSink, SCRAPED_SOURCE_PREFIX};
use crate::store::SubscriberStore;
use prospect_core::{AppConfig, ListId, ScrapeResult, ScrapeSource, ScrapingConfig};
use prospect_llm::{LlmProvider, OpenAiProvider};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// What to scrape and where to store it.
#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    /// Target email list
    pub list_id: ListId,
    /// Who we are looking for
    pub target_audience: String,
    /// What we are offering them
    pub product: String,
    /// Stop after this many new subscribers; defaults to the configured value
    pub min_emails: Option<usize>,
}

impl ScrapeRequest {
    /// Create a request using the configured minimum.
    #[must_use]
    pub fn new(
        list_id: ListId,
        target_audience: impl Into<String>,
        product: impl Into<String>,
    ) -> Self {
        Self {
            list_id,
            target_audience: target_audience.into(),
            product: product.into(),
            min_emails: None,
        }
    }

    /// Override the minimum number of emails.
    #[must_use]
    pub fn with_min_emails(mut self, min_emails: usize) -> Self {
        self.min_emails = Some(min_emails);
        self
    }
}

/// Returned by [`ScrapeService::start_scrape`] once ranking is done.
#[derive(Debug)]
pub struct ScrapeLaunch {
    /// Audience analysis stored with each subscriber
    pub analysis: AudienceAnalysis,
    /// The highest ranked sources (preview)
    pub sources: Vec<ScrapeSource>,
    /// Number of sources the run will visit
    pub total_sources: usize,
    /// Handle to the background run
    pub handle: ScrapeHandle,
}

/// Handle to a background scrape run.
#[derive(Debug)]
pub struct ScrapeHandle {
    state: watch::Receiver<ScrapeState>,
    cancel: CancellationToken,
    task: JoinHandle<Result<ScrapeOutcome>>,
}

impl ScrapeHandle {
    /// Current state of the run.
    #[must_use]
    pub fn state(&self) -> ScrapeState {
        *self.state.borrow()
    }

    /// A receiver that observes every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ScrapeState> {
        self.state.clone()
    }

    /// Ask the run to stop after the fetches already in flight.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// The token shared with the run.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Whether the background task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the run to end.
    ///
    /// # Errors
    /// Returns the run's own error, or `ScrapeError::TaskJoin` if the task
    /// panicked or was aborted.
    pub async fn join(self) -> Result<ScrapeOutcome> {
        self.task
            .await
            .map_err(|e| ScrapeError::TaskJoin(e.to_string()))?
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeOutcome {
    /// How the run ended
    pub state: ScrapeState,
    /// Every fetch result gathered
    pub results: Vec<ScrapeResult>,
    /// Sink counters
    pub stats: SinkStats,
    /// Number of ranked sources
    pub total_sources: usize,
}

impl ScrapeOutcome {
    /// Sources fetched successfully.
    #[must_use]
    pub fn succeeded_sources(&self) -> usize {
        self.results.iter().filter(|r| r.succeeded).count()
    }

    /// Sources whose fetch failed.
    #[must_use]
    pub fn failed_sources(&self) -> usize {
        self.results.len() - self.succeeded_sources()
    }
}

/// Scraped subscriber count of a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScrapeStatus {
    /// Records whose source marks them as scraped
    pub scraped_count: u64,
}

/// How many scraped subscribers the list holds.
///
/// Needs only the store, so callers without a provider key can poll it.
///
/// # Errors
/// Returns `ScrapeError::ListNotFound` for an unknown list and
/// `ScrapeError::Store` if a query fails.
pub async fn scrape_status(
    store: &dyn SubscriberStore,
    list_id: &ListId,
) -> Result<ScrapeStatus> {
    if !store.list_exists(list_id).await? {
        return Err(ScrapeError::ListNotFound(list_id.to_string()));
    }
    let scraped_count = store
        .count_with_source_prefix(list_id, SCRAPED_SOURCE_PREFIX)
        .await?;
    Ok(ScrapeStatus { scraped_count })
}

struct PreparedRun {
    list_id: ListId,
    min_emails: usize,
    analysis: AudienceAnalysis,
    sources: Vec<ScrapeSource>,
}

/// Entry point of the scrape pipeline.
///
/// Clones share the rate limiter, so all runs of one service respect the
/// same per-domain spacing.
#[derive(Clone)]
pub struct ScrapeService {
    store: Arc<dyn SubscriberStore>,
    ranker: SourceRanker,
    analyzer: AudienceAnalyzer,
    fetcher: Arc<dyn SourceFetch>,
    clock: Arc<dyn Clock>,
    config: ScrapingConfig,
}

impl ScrapeService {
    /// Build the service from application config with the `OpenAI` provider
    /// and the HTTP fetcher.
    ///
    /// # Errors
    /// Returns `ScrapeError::Configuration` when the API key is missing or the
    /// HTTP client cannot be set up.
    pub fn from_config(config: &AppConfig, store: Arc<dyn SubscriberStore>) -> Result<Self> {
        config
            .llm
            .require_api_key()
            .map_err(|e| ScrapeError::Configuration(e.to_string()))?;
        let provider = OpenAiProvider::from_config(&config.llm)
            .map_err(|e| ScrapeError::Configuration(e.to_string()))?;

        let clock: Arc<dyn Clock> = Arc::new(TokioClock);
        let limiter = Arc::new(RateLimiter::with_clock(
            Duration::from_millis(config.scraping.request_delay_ms),
            Arc::clone(&clock),
        ));
        let fetcher = HttpFetcher::from_config(&config.scraping, limiter)?;

        Ok(Self::new(config, Arc::new(provider), Arc::new(fetcher), store).with_clock(clock))
    }

    /// Build the service from explicit parts.
    #[must_use]
    pub fn new(
        config: &AppConfig,
        provider: Arc<dyn LlmProvider>,
        fetcher: Arc<dyn SourceFetch>,
        store: Arc<dyn SubscriberStore>,
    ) -> Self {
        Self {
            store,
            ranker: SourceRanker::from_config(Arc::clone(&provider), &config.llm),
            analyzer: AudienceAnalyzer::from_config(provider, &config.llm),
            fetcher,
            clock: Arc::new(TokioClock),
            config: config.scraping.clone(),
        }
    }

    /// Use a specific clock for batch pacing.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Rank sources and launch the run in the background.
    ///
    /// Returns as soon as ranking is done.
    ///
    /// # Errors
    /// Returns `ScrapeError::InvalidRequest` for empty fields,
    /// `ScrapeError::ListNotFound` for an unknown list and
    /// `ScrapeError::Store` if the list cannot be checked.
    pub async fn start_scrape(&self, request: ScrapeRequest) -> Result<ScrapeLaunch> {
        let prepared = self.prepare(request).await?;
        let (state_tx, state_rx) = watch::channel(ScrapeState::Starting);

        let analysis = prepared.analysis.clone();
        let total_sources = prepared.sources.len();
        let preview = prepared
            .sources
            .iter()
            .take(self.config.preview_limit)
            .cloned()
            .collect();

        let cancel = CancellationToken::new();
        let service = self.clone();
        let run_cancel = cancel.clone();
        let task =
            tokio::spawn(async move { service.execute(prepared, run_cancel, state_tx).await });

        Ok(ScrapeLaunch {
            analysis,
            sources: preview,
            total_sources,
            handle: ScrapeHandle {
                state: state_rx,
                cancel,
                task,
            },
        })
    }

    /// Run the whole pipeline and wait for it to finish.
    ///
    /// # Errors
    /// Same as [`ScrapeService::start_scrape`], plus store errors while
    /// seeding the seen-set.
    pub async fn run_scrape(&self, request: ScrapeRequest) -> Result<ScrapeOutcome> {
        let prepared = self.prepare(request).await?;
        let (state_tx, _state_rx) = watch::channel(ScrapeState::Starting);
        self.execute(prepared, CancellationToken::new(), state_tx)
            .await
    }

    /// How many scraped subscribers the list holds.
    ///
    /// # Errors
    /// See [`scrape_status`].
    pub async fn scrape_status(&self, list_id: &ListId) -> Result<ScrapeStatus> {
        scrape_status(self.store.as_ref(), list_id).await
    }

    async fn prepare(&self, request: ScrapeRequest) -> Result<PreparedRun> {
        let target_audience = request.target_audience.trim();
        let product = request.product.trim();
        if target_audience.is_empty() {
            return Err(ScrapeError::InvalidRequest(
                "target audience is required".to_string(),
            ));
        }
        if product.is_empty() {
            return Err(ScrapeError::InvalidRequest("product is required".to_string()));
        }

        let min_emails = request
            .min_emails
            .unwrap_or(self.config.default_min_emails);
        if min_emails == 0 {
            return Err(ScrapeError::InvalidRequest(
                "minimum email count must be at least 1".to_string(),
            ));
        }

        if !self.store.list_exists(&request.list_id).await? {
            return Err(ScrapeError::ListNotFound(request.list_id.to_string()));
        }

        tracing::info!(
            "Preparing scrape for list {}: audience '{}', product '{}', min {} emails",
            request.list_id,
            target_audience,
            product,
            min_emails
        );

        let (analysis, sources) = tokio::join!(
            self.analyzer.analyze(target_audience, product),
            self.ranker.rank(target_audience, product)
        );

        Ok(PreparedRun {
            list_id: request.list_id,
            min_emails,
            analysis,
            sources,
        })
    }

    async fn execute(
        &self,
        prepared: PreparedRun,
        cancel: CancellationToken,
        state: watch::Sender<ScrapeState>,
    ) -> Result<ScrapeOutcome> {
        let PreparedRun {
            list_id,
            min_emails,
            analysis,
            sources,
        } = prepared;

        let mut sink = match SubscriberSink::new(
            Arc::clone(&self.store),
            list_id.clone(),
            &analysis,
            min_emails,
            cancel.clone(),
        )
        .await
        {
            Ok(sink) => sink,
            Err(e) => {
                tracing::error!("Cannot load known emails of list {}: {}", list_id, e);
                state.send_replace(ScrapeState::Failed);
                return Err(e);
            }
        };

        let orchestrator = ScrapeOrchestrator::from_config(Arc::clone(&self.fetcher), &self.config)
            .with_clock(Arc::clone(&self.clock));
        let results = orchestrator
            .run(&sources, &mut sink, &cancel, Some(&state))
            .await;

        let final_state = if sink.is_saturated() {
            ScrapeState::Saturated
        } else if cancel.is_cancelled() {
            ScrapeState::Cancelled
        } else {
            ScrapeState::Completed
        };
        state.send_replace(final_state);

        let stats = sink.stats();
        tracing::info!(
            "Scrape for list {} ended {:?}: {} saved, {} duplicates, {} invalid, {} failed saves",
            list_id,
            final_state,
            stats.saved,
            stats.duplicates,
            stats.invalid,
            stats.failed_saves
        );

        Ok(ScrapeOutcome {
            state: final_state,
            results,
            stats,
            total_sources: sources.len(),
        })
    }
}
