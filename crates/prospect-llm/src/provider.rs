//! Provider seam and the request/response shapes the pipeline exchanges.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A generative text backend.
///
/// Ranking and audience analysis run concurrently against one shared
/// provider, hence `Send + Sync`.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Run one completion.
    ///
    /// # Errors
    /// Returns error if the provider fails, network issues occur, or response parsing fails.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Short name used in log lines.
    fn provider_id(&self) -> &str;
}

/// One prompt, optionally preceded by a system instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Instruction sent ahead of the prompt
    pub system_prompt: Option<String>,

    /// The user prompt
    pub prompt: String,

    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,

    /// Sampling temperature
    pub temperature: Option<f32>,

    /// Constrain the model to emit a single JSON object
    pub json_output: bool,
}

impl CompletionRequest {
    /// Create a request for `prompt` with provider defaults.
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: None,
            prompt: prompt.into(),
            max_tokens: None,
            temperature: None,
            json_output: false,
        }
    }

    /// Set the maximum tokens to generate.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the system prompt.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Request a JSON object response.
    #[must_use]
    pub fn with_json_output(mut self) -> Self {
        self.json_output = true;
        self
    }
}

/// Reply of a completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// The generated text
    pub content: String,

    /// Model that generated the response
    pub model: String,

    /// Stop reason (e.g., "`stop`", "`length`")
    pub stop_reason: Option<String>,

    /// Usage statistics
    pub usage: Option<Usage>,
}

impl CompletionResponse {
    /// A response carrying only text.
    #[must_use]
    pub fn text(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: model.into(),
            stop_reason: Some("stop".to_string()),
            usage: None,
        }
    }

    /// Whether generation stopped at the token limit.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.stop_reason.as_deref() == Some("length")
    }

    /// The JSON document in the reply.
    ///
    /// Models occasionally wrap JSON in a markdown code fence even in JSON
    /// mode; the fence and an optional `json` tag are removed.
    #[must_use]
    pub fn json_payload(&self) -> &str {
        let trimmed = self.content.trim();
        let Some(fenced) = trimmed.strip_prefix("```") else {
            return trimmed;
        };
        let body = fenced.strip_prefix("json").unwrap_or(fenced);
        body.strip_suffix("```").unwrap_or(body).trim()
    }
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Input tokens consumed
    pub input_tokens: u32,

    /// Output tokens generated
    pub output_tokens: u32,
}

impl Usage {
    /// Get total tokens used.
    #[must_use]
    pub fn total_tokens(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_request_builder() {
        let req = CompletionRequest::new("Hello")
            .with_max_tokens(100)
            .with_temperature(0.7)
            .with_system_prompt("You return only JSON")
            .with_json_output();

        assert_eq!(req.prompt, "Hello");
        assert_eq!(req.max_tokens, Some(100));
        assert_eq!(req.temperature, Some(0.7));
        assert_eq!(req.system_prompt.as_deref(), Some("You return only JSON"));
        assert!(req.json_output);
    }

    #[test]
    fn test_json_payload_strips_fences() {
        let plain = CompletionResponse::text(" {\"sources\": []}\n", "m");
        assert_eq!(plain.json_payload(), "{\"sources\": []}");

        let fenced = CompletionResponse::text("```json\n{\"sources\": []}\n```", "m");
        assert_eq!(fenced.json_payload(), "{\"sources\": []}");

        let bare_fence = CompletionResponse::text("```\n{}\n```", "m");
        assert_eq!(bare_fence.json_payload(), "{}");
    }

    #[test]
    fn test_truncation_flag() {
        let mut response = CompletionResponse::text("{", "m");
        assert!(!response.is_truncated());
        response.stop_reason = Some("length".to_string());
        assert!(response.is_truncated());
    }

    #[test]
    fn test_usage_total_tokens() {
        let usage = Usage {
            input_tokens: 10,
            output_tokens: 20,
        };
        assert_eq!(usage.total_tokens(), 30);
    }
}
