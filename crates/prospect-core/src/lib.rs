//! Prospect Core - Foundation crate for the Prospect email-acquisition pipeline.
//!
//! This crate provides shared types, error handling and configuration
//! management that the other Prospect crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths and env overrides
//! - [`types`] - Shared domain types (`ListId`, `SourceKind`, `ScrapeSource`, `ScrapeResult`)
//!
//! # Example
//!
//! ```rust
//! use prospect_core::{AppConfig, ScrapeSource, SourceKind};
//!
//! let config = AppConfig::default();
//! assert_eq!(config.scraping.concurrency, 5);
//!
//! let source = ScrapeSource::new("https://www.pkt.pl", SourceKind::Directory, 5, "PKT");
//! assert_eq!(source.priority, 5);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{AppConfig, DatabaseConfig, LlmConfig, ScrapingConfig};
pub use error::{ConfigError, ConfigResult, ProspectError, Result};
pub use types::{ListId, ScrapeResult, ScrapeSource, SourceKind, SubscriberStatus};
