//! Prospect LLM - generative text provider abstraction.
//!
//! The scraping pipeline asks a generative model two questions per run:
//! which public sources are likely to list the target audience, and what
//! the audience's pain points are. Both are single JSON-mode completions.
//!
//! # Example
//!
//! ```rust,no_run
//! use prospect_core::LlmConfig;
//! use prospect_llm::{CompletionRequest, LlmProvider, OpenAiProvider};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LlmConfig {
//!     api_key: Some("sk-...".to_string()),
//!     ..LlmConfig::default()
//! };
//! let provider = OpenAiProvider::from_config(&config)?;
//!
//! let request = CompletionRequest::new("Return {\"sources\": []}")
//!     .with_system_prompt("You return only valid JSON.")
//!     .with_json_output();
//! let response = provider.complete(request).await?;
//!
//! println!("Response: {}", response.json_payload());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod error;
pub mod provider;
pub mod providers;

// Re-export commonly used types
pub use error::{LlmError, Result};
pub use provider::{CompletionRequest, CompletionResponse, LlmProvider, Usage};
pub use providers::OpenAiProvider;
