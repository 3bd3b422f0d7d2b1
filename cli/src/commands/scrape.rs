use crate::cli::ScrapeArgs;
use crate::error::CommandError;
use prospect_core::{ListId, ScrapeSource};
use prospect_scraper::{
    AudienceAnalysis, ScrapeLaunch, ScrapeRequest, ScrapeService, ScrapeState, SinkStats,
};
use serde::Serialize;
use std::fmt;
use std::future::Future;

/// Result of a finished `scrape` command.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeReport {
    pub list_id: String,
    pub analysis: AudienceAnalysis,
    pub preview: Vec<ScrapeSource>,
    pub total_sources: usize,
    pub state: ScrapeState,
    pub stats: SinkStats,
    pub succeeded_sources: usize,
    pub failed_sources: usize,
}

/// Start a scrape and follow it to the end.
///
/// The run is cancelled once `shutdown` resolves (ctrl-c in the binary).
/// Fetches already in flight finish, nothing more is stored.
pub async fn run_scrape<F>(
    service: &ScrapeService,
    args: ScrapeArgs,
    shutdown: F,
) -> Result<ScrapeReport, CommandError>
where
    F: Future<Output = ()>,
{
    let list_id = ListId::new(args.list)?;
    let mut request = ScrapeRequest::new(list_id.clone(), args.audience, args.product);
    if let Some(min_emails) = args.min_emails {
        request = request.with_min_emails(min_emails);
    }

    let ScrapeLaunch {
        analysis,
        sources,
        total_sources,
        handle,
    } = service.start_scrape(request).await?;

    tracing::info!(
        "Scrape started for list {} with {} sources",
        list_id,
        total_sources
    );
    for source in &sources {
        tracing::debug!("  [{}] {} {}", source.priority, source.kind, source.url);
    }

    let mut states = handle.subscribe();
    let cancel = handle.cancellation_token();
    tokio::pin!(shutdown);
    let mut interrupted = false;

    loop {
        tokio::select! {
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *states.borrow_and_update();
                if let ScrapeState::Fetching { batch, batches } = state {
                    tracing::info!("Fetching batch {}/{}", batch, batches);
                }
                if state.is_terminal() {
                    break;
                }
            }
            () = &mut shutdown, if !interrupted => {
                interrupted = true;
                tracing::warn!("Interrupted, cancelling scrape of list {}", list_id);
                cancel.cancel();
            }
        }
    }

    let outcome = handle.join().await?;
    Ok(ScrapeReport {
        list_id: list_id.to_string(),
        analysis,
        preview: sources,
        total_sources,
        state: outcome.state,
        stats: outcome.stats,
        succeeded_sources: outcome.succeeded_sources(),
        failed_sources: outcome.failed_sources(),
    })
}

/// Resolves on ctrl-c; never resolves if the signal cannot be watched.
pub async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Cannot listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
}

impl fmt::Display for ScrapeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.analysis.key_message.is_empty() {
            writeln!(f, "Key message: {}", self.analysis.key_message)?;
        }

        writeln!(
            f,
            "Top sources ({} of {}):",
            self.preview.len(),
            self.total_sources
        )?;
        for source in &self.preview {
            writeln!(
                f,
                "  {:>2}  {:<9}  {}",
                source.priority,
                source.kind.as_str(),
                source.url
            )?;
        }

        let ending = match self.state {
            ScrapeState::Saturated => "target reached",
            ScrapeState::Cancelled => "cancelled",
            ScrapeState::Failed => "failed",
            _ => "all sources processed",
        };
        writeln!(f, "Scrape of {} finished: {}", self.list_id, ending)?;
        writeln!(
            f,
            "  sources: {} ok, {} failed",
            self.succeeded_sources, self.failed_sources
        )?;
        writeln!(
            f,
            "  emails:  {} saved, {} duplicates, {} invalid",
            self.stats.saved, self.stats.duplicates, self.stats.invalid
        )?;
        if self.stats.failed_saves > 0 {
            writeln!(f, "  {} emails could not be saved", self.stats.failed_saves)?;
        }
        Ok(())
    }
}
