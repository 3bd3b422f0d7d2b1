//! Prospect Scraper - audience-driven email acquisition pipeline.
//!
//! Turns a target audience and product description into pending subscribers
//! on an email list:
//!
//! 1. [`SourceRanker`] asks the generative provider for likely sources and
//!    falls back to a static table when that fails.
//! 2. [`ScrapeOrchestrator`] fetches the sources in bounded batches through a
//!    [`SourceFetch`] implementation, spacing requests per domain with a
//!    [`RateLimiter`].
//! 3. [`extractor`] pulls addresses out of each page.
//! 4. [`SubscriberSink`] dedupes and stores them, stopping the run once the
//!    requested number has been saved.
//!
//! # Example
//!
//! ```rust,ignore
//! use prospect_scraper::{ScrapeRequest, ScrapeService};
//! use std::sync::Arc;
//!
//! let service = ScrapeService::from_config(&config, Arc::new(database))?;
//! let launch = service
//!     .start_scrape(ScrapeRequest::new(list_id, "copywriterzy", "AI content tool"))
//!     .await?;
//! println!("{} sources ranked", launch.total_sources);
//! let outcome = launch.handle.join().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod analysis;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod orchestrator;
pub mod ranker;
pub mod rate_limit;
pub mod service;
pub mod sink;
pub mod store;

// Re-export commonly used types
pub use analysis::{AudienceAnalysis, AudienceAnalyzer};
pub use error::{Result, ScrapeError};
pub use fetcher::{HttpFetcher, SourceFetch};
pub use orchestrator::{ScrapeOrchestrator, ScrapeState};
pub use ranker::{fallback_sources, SourceRanker};
pub use rate_limit::{Clock, ManualClock, RateLimiter, TokioClock};
pub use service::{
    scrape_status, ScrapeHandle, ScrapeLaunch, ScrapeOutcome, ScrapeRequest, ScrapeService,
    ScrapeStatus,
};
pub use sink::{Progress, ResultSink, SinkStats, SubscriberSink, SCRAPED_SOURCE_PREFIX};
pub use store::SubscriberStore;
