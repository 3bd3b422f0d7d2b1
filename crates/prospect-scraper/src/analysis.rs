//! Audience analysis.
//!
//! Produces a short marketing profile of the target audience that is stored
//! alongside every scraped subscriber.

use prospect_core::LlmConfig;
use prospect_llm::{CompletionRequest, LlmProvider};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const SYSTEM_PROMPT: &str = "Jesteś ekspertem od marketingu. Zwracasz TYLKO poprawny JSON.";

/// Problems and messaging for a target audience.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AudienceAnalysis {
    /// Main problems of the audience
    pub problems: Vec<String>,
    /// How the product addresses them
    pub solution: String,
    /// Message most likely to resonate
    pub key_message: String,
    /// Most pressing pain points
    pub pain_points: Vec<String>,
}

impl AudienceAnalysis {
    /// Whether the analysis carries no information.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Runs the audience analysis prompt.
#[derive(Clone)]
pub struct AudienceAnalyzer {
    provider: Arc<dyn LlmProvider>,
    temperature: f32,
    max_tokens: u32,
}

impl AudienceAnalyzer {
    /// Create an analyzer with default sampling settings.
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self::from_config(provider, &LlmConfig::default())
    }

    /// Create an analyzer using the `[llm]` sampling settings.
    #[must_use]
    pub fn from_config(provider: Arc<dyn LlmProvider>, config: &LlmConfig) -> Self {
        Self {
            provider,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    /// Analyse the audience. Any failure yields an empty analysis.
    pub async fn analyze(&self, target_audience: &str, product: &str) -> AudienceAnalysis {
        let request = CompletionRequest::new(analysis_prompt(target_audience, product))
            .with_system_prompt(SYSTEM_PROMPT)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
            .with_json_output();

        let response = match self.provider.complete(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Audience analysis failed: {}", e);
                return AudienceAnalysis::default();
            }
        };

        serde_json::from_str(response.json_payload()).unwrap_or_else(|e| {
            tracing::warn!("Audience analysis returned unusable JSON: {}", e);
            AudienceAnalysis::default()
        })
    }
}

fn analysis_prompt(target_audience: &str, product: &str) -> String {
    format!(
        r#"Jesteś ekspertem od marketingu i psychologii konsumenta.

Grupa docelowa: {target_audience}
Produkt: {product}

Przeanalizuj:
1. Jakie są główne problemy tej grupy?
2. Jak nasz produkt rozwiązuje te problemy?
3. Jaki jest kluczowy przekaz, który trafi do tej grupy?
4. Jakie są najważniejsze pain points?

Zwróć JSON:
{{
  "problems": ["problem1", "problem2"],
  "solution": "jak produkt rozwiązuje problemy",
  "keyMessage": "główny przekaz",
  "painPoints": ["pain1", "pain2"]
}}"#
    )
}
