//! Source ranking.
//!
//! Asks the generative provider where the target audience can be found and
//! turns the answer into an ordered list of [`ScrapeSource`]s. Any provider
//! or parse failure falls back to a keyword table, so ranking always yields
//! at least the generic business directories.

use prospect_core::{LlmConfig, ScrapeSource, SourceKind};
use prospect_llm::{CompletionRequest, LlmProvider};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// Priority used when the provider omits one or sends a non-number.
pub const DEFAULT_PRIORITY: u8 = 5;

const SYSTEM_PROMPT: &str = "Jesteś ekspertem od lead generation. \
Zwracasz TYLKO poprawny obiekt JSON bez dodatkowego tekstu.";

/// Produces ranked scrape sources for an audience and product.
#[derive(Clone)]
pub struct SourceRanker {
    provider: Arc<dyn LlmProvider>,
    temperature: f32,
    max_tokens: u32,
}

impl SourceRanker {
    /// Create a ranker with the default sampling settings.
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self::from_config(provider, &LlmConfig::default())
    }

    /// Create a ranker using the `[llm]` sampling settings.
    #[must_use]
    pub fn from_config(provider: Arc<dyn LlmProvider>, config: &LlmConfig) -> Self {
        Self {
            provider,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    /// Rank sources for `target_audience` and `product`.
    ///
    /// Never fails and never returns an empty list.
    pub async fn rank(&self, target_audience: &str, product: &str) -> Vec<ScrapeSource> {
        let request = CompletionRequest::new(ranking_prompt(target_audience, product))
            .with_system_prompt(SYSTEM_PROMPT)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
            .with_json_output();

        let outcome = match self.provider.complete(request).await {
            Ok(response) => {
                if response.is_truncated() {
                    tracing::warn!("Source ranking reply hit the token limit");
                }
                parse_sources(response.json_payload())
            }
            Err(e) => Err(e.to_string()),
        };

        match outcome {
            Ok(sources) => {
                tracing::info!(
                    "Provider {} ranked {} sources",
                    self.provider.provider_id(),
                    sources.len()
                );
                sources
            }
            Err(reason) => {
                tracing::warn!("Source ranking failed, using fallback sources: {}", reason);
                fallback_sources(target_audience)
            }
        }
    }
}

fn ranking_prompt(target_audience: &str, product: &str) -> String {
    format!(
        r#"Jesteś ekspertem od lead generation i email marketingu.

Grupa docelowa: {target_audience}
Produkt: {product}

Zidentyfikuj najlepsze publiczne źródła internetowe, gdzie można znaleźć adresy email osób z tej grupy docelowej, które mają problem rozwiązywany przez nasz produkt.

Zwróć obiekt JSON dokładnie w tym formacie:
{{
  "sources": [
    {{
      "url": "pełny adres URL",
      "type": "website|directory|forum|social|job_board",
      "priority": 1-10 (10 = najwyższy priorytet),
      "description": "dlaczego to źródło jest dobre"
    }}
  ]
}}

Skup się na:
- stronach firm z sekcjami "Kontakt" lub "Zespół"
- katalogach branżowych
- forach i społecznościach
- publicznych profilach LinkedIn
- stronach z ogłoszeniami o pracę
- blogach branżowych z autorami"#
    )
}

#[derive(Debug, Deserialize)]
struct RankingPayload {
    sources: Vec<RawSource>,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    #[serde(default)]
    url: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    priority: Option<Value>,
    #[serde(default)]
    description: Option<String>,
}

/// Parse a `{"sources": [...]}` payload into normalised, sorted sources.
///
/// # Errors
/// Returns a description when the payload has another shape or yields no
/// usable source.
pub fn parse_sources(content: &str) -> Result<Vec<ScrapeSource>, String> {
    let payload: RankingPayload =
        serde_json::from_str(content).map_err(|e| format!("unexpected ranking payload: {e}"))?;

    let mut sources: Vec<ScrapeSource> = payload
        .sources
        .into_iter()
        .filter_map(normalize_source)
        .collect();

    if sources.is_empty() {
        return Err("ranking payload contained no usable sources".to_string());
    }

    // stable: equal priorities keep provider order
    sources.sort_by(|a, b| b.priority.cmp(&a.priority));
    Ok(sources)
}

fn normalize_source(raw: RawSource) -> Option<ScrapeSource> {
    let url = raw.url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty())?;
    let kind = raw
        .kind
        .as_deref()
        .and_then(SourceKind::from_label)
        .unwrap_or_default();

    Some(ScrapeSource::new(
        url,
        kind,
        normalize_priority(raw.priority.as_ref()),
        raw.description.unwrap_or_default(),
    ))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn normalize_priority(value: Option<&Value>) -> u8 {
    let Some(number) = value.and_then(Value::as_f64) else {
        return DEFAULT_PRIORITY;
    };
    let clamped = number.round().clamp(
        f64::from(ScrapeSource::MIN_PRIORITY),
        f64::from(ScrapeSource::MAX_PRIORITY),
    );
    clamped as u8
}

/// Static sources chosen by keywords in the audience description.
///
/// Always ends with the generic business directories.
#[must_use]
pub fn fallback_sources(target_audience: &str) -> Vec<ScrapeSource> {
    let audience = target_audience.to_lowercase();
    let mut sources = Vec::new();

    if audience.contains("copywriter") {
        sources.push(ScrapeSource::new(
            "https://www.linkedin.com/search/results/people/?keywords=copywriter",
            SourceKind::Social,
            9,
            "LinkedIn - copywriterzy",
        ));
        sources.push(ScrapeSource::new(
            "https://www.fiverr.com/categories/writing-translation/copywriting-services",
            SourceKind::Directory,
            8,
            "Fiverr - copywriterzy freelancerzy",
        ));
    }

    if ["e-commerce", "ecommerce", "sklep", "marketplace"]
        .iter()
        .any(|keyword| audience.contains(keyword))
    {
        sources.push(ScrapeSource::new(
            "https://www.allegro.pl",
            SourceKind::Directory,
            7,
            "Allegro - sprzedawcy",
        ));
    }

    sources.push(ScrapeSource::new(
        "https://www.goldenpages.pl",
        SourceKind::Directory,
        6,
        "Golden Pages - katalog firm",
    ));
    sources.push(ScrapeSource::new(
        "https://www.pkt.pl",
        SourceKind::Directory,
        5,
        "PKT - katalog firm",
    ));

    sources
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use prospect_llm::{CompletionResponse, LlmError};
    use std::sync::Mutex;

    struct FakeProvider {
        reply: std::result::Result<String, ()>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl FakeProvider {
        fn replying(content: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(content.to_string()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: Err(()),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for FakeProvider {
        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> prospect_llm::Result<CompletionResponse> {
            self.requests.lock().expect("lock").push(request);
            match &self.reply {
                Ok(content) => Ok(CompletionResponse::text(content.clone(), "fake")),
                Err(()) => Err(LlmError::Timeout { seconds: 60 }),
            }
        }

        fn provider_id(&self) -> &str {
            "fake"
        }
    }

    fn urls(sources: &[ScrapeSource]) -> Vec<&str> {
        sources.iter().map(|s| s.url.as_str()).collect()
    }

    #[test]
    fn test_parse_sources_normalizes_and_sorts() {
        let content = r#"{"sources": [
            {"url": "https://a.pl", "type": "forum", "priority": 3, "description": "A"},
            {"url": "  ", "type": "forum", "priority": 10},
            {"url": "https://b.pl", "type": "carrier-pigeon", "priority": 42},
            {"url": "https://c.pl", "priority": "high"},
            {"url": "https://d.pl", "type": "job_board", "priority": -4},
            {"url": "https://e.pl", "type": "social"}
        ]}"#;

        let sources = parse_sources(content).expect("parse");

        assert_eq!(
            urls(&sources),
            vec!["https://b.pl", "https://c.pl", "https://e.pl", "https://a.pl", "https://d.pl"]
        );
        assert_eq!(sources[0].priority, 10);
        assert_eq!(sources[0].kind, SourceKind::Website);
        assert_eq!(sources[1].priority, DEFAULT_PRIORITY);
        assert_eq!(sources[2].kind, SourceKind::Social);
        assert_eq!(sources[3].description, "A");
        assert_eq!(sources[4].priority, 1);
        assert_eq!(sources[4].kind, SourceKind::JobBoard);
    }

    #[test]
    fn test_parse_sources_stable_on_ties() {
        let content = r#"{"sources": [
            {"url": "https://first.pl", "priority": 7},
            {"url": "https://second.pl", "priority": 7},
            {"url": "https://third.pl", "priority": 7}
        ]}"#;

        let sources = parse_sources(content).expect("parse");
        assert_eq!(
            urls(&sources),
            vec!["https://first.pl", "https://second.pl", "https://third.pl"]
        );
    }

    #[test]
    fn test_parse_sources_rejects_other_shapes() {
        assert!(parse_sources(r#"[{"url": "https://a.pl"}]"#).is_err());
        assert!(parse_sources(r#"{"results": [{"url": "https://a.pl"}]}"#).is_err());
        assert!(parse_sources(r#"{"sources": "https://a.pl"}"#).is_err());
        assert!(parse_sources("not json").is_err());
        assert!(parse_sources(r#"{"sources": []}"#).is_err());
        assert!(parse_sources(r#"{"sources": [{"description": "no url"}]}"#).is_err());
    }

    #[test]
    fn test_fallback_for_copywriters() {
        let sources = fallback_sources("Copywriterzy freelancerzy");
        assert_eq!(
            urls(&sources),
            vec![
                "https://www.linkedin.com/search/results/people/?keywords=copywriter",
                "https://www.fiverr.com/categories/writing-translation/copywriting-services",
                "https://www.goldenpages.pl",
                "https://www.pkt.pl",
            ]
        );
        assert_eq!(sources[0].kind, SourceKind::Social);
        assert_eq!(sources[0].priority, 9);
    }

    #[test]
    fn test_fallback_for_ecommerce() {
        for audience in ["właściciele sklepów", "E-commerce", "ecommerce managers", "Marketplace sellers"] {
            let sources = fallback_sources(audience);
            assert_eq!(sources[0].url, "https://www.allegro.pl", "{audience}");
            assert_eq!(sources.len(), 3);
        }
    }

    #[test]
    fn test_fallback_always_has_directories() {
        let sources = fallback_sources("dentyści");
        assert_eq!(urls(&sources), vec!["https://www.goldenpages.pl", "https://www.pkt.pl"]);
    }

    #[tokio::test]
    async fn test_rank_uses_provider_in_json_mode() {
        let provider = FakeProvider::replying(
            r#"{"sources": [{"url": "https://forum.pl", "type": "forum", "priority": 8, "description": "forum"}]}"#,
        );
        let ranker = SourceRanker::new(provider.clone());

        let sources = ranker.rank("copywriterzy", "AI content tool").await;

        assert_eq!(urls(&sources), vec!["https://forum.pl"]);
        let requests = provider.requests.lock().expect("lock");
        assert_eq!(requests.len(), 1);
        assert!(requests[0].json_output);
        assert_eq!(requests[0].temperature, Some(0.7));
        assert!(requests[0].system_prompt.is_some());
        assert!(requests[0].prompt.contains("copywriterzy"));
        assert!(requests[0].prompt.contains("AI content tool"));
    }

    #[tokio::test]
    async fn test_rank_accepts_fenced_reply() {
        let provider = FakeProvider::replying(
            "```json\n{\"sources\": [{\"url\": \"https://katalog.pl\", \"type\": \"directory\", \"priority\": 6}]}\n```",
        );
        let sources = SourceRanker::new(provider).rank("dentyści", "CRM").await;

        assert_eq!(urls(&sources), vec!["https://katalog.pl"]);
        assert_eq!(sources[0].kind, SourceKind::Directory);
    }

    #[tokio::test]
    async fn test_rank_falls_back_on_provider_failure() {
        let ranker = SourceRanker::new(FakeProvider::failing());
        let sources = ranker.rank("copywriterzy", "AI content tool").await;

        assert!(!sources.is_empty());
        assert!(urls(&sources).contains(&"https://www.goldenpages.pl"));
        assert!(urls(&sources).contains(&"https://www.pkt.pl"));
    }

    #[tokio::test]
    async fn test_rank_falls_back_on_bad_payload() {
        let ranker = SourceRanker::new(FakeProvider::replying(r#"[{"url": "https://a.pl"}]"#));
        let sources = ranker.rank("anyone", "anything").await;
        assert_eq!(
            urls(&sources),
            vec!["https://www.goldenpages.pl", "https://www.pkt.pl"]
        );
    }
}
