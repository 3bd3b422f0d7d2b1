//! Source fetching.
//!
//! `HttpFetcher` downloads a static HTML page politely (per-domain spacing,
//! desktop user agent, hard timeout) and runs it through the extractor. It
//! never fails: every problem is folded into a failed `ScrapeResult`.

use crate::error::{Result, ScrapeError};
use crate::extractor::extract_from_html;
use crate::rate_limit::RateLimiter;
use async_trait::async_trait;
use prospect_core::{ScrapeResult, ScrapingConfig, SourceKind};
use rand::seq::SliceRandom;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml";

/// Fetches one source and reports the emails found on it.
#[async_trait]
pub trait SourceFetch: Send + Sync {
    /// Fetch `url` and extract emails. Failures are reported in the result.
    async fn fetch(&self, url: &str, kind: SourceKind) -> ScrapeResult;
}

/// Plain HTTP implementation of [`SourceFetch`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    limiter: Arc<RateLimiter>,
    user_agents: Vec<String>,
    timeout: Duration,
}

impl HttpFetcher {
    /// Build a fetcher from the `[scraping]` section, sharing `limiter`.
    ///
    /// # Errors
    /// Returns `ScrapeError::Configuration` if no user agents are configured
    /// and `ScrapeError::Http` if the client cannot be built.
    pub fn from_config(config: &ScrapingConfig, limiter: Arc<RateLimiter>) -> Result<Self> {
        if config.user_agents.is_empty() {
            return Err(ScrapeError::Configuration(
                "at least one user agent is required".to_string(),
            ));
        }

        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScrapeError::Http(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            limiter,
            user_agents: config.user_agents.clone(),
            timeout,
        })
    }

    /// Limiter shared by this fetcher.
    #[must_use]
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    fn pick_user_agent(&self) -> &str {
        self.user_agents
            .choose(&mut rand::thread_rng())
            .map_or("", String::as_str)
    }

    async fn fetch_body(&self, url: &str) -> std::result::Result<String, String> {
        let parsed = Url::parse(url).map_err(|e| format!("invalid URL: {e}"))?;
        let domain = parsed
            .host_str()
            .ok_or_else(|| "invalid URL: missing host".to_string())?
            .to_string();

        self.limiter.acquire(&domain).await;

        let user_agent = self.pick_user_agent().to_string();
        let response = self
            .client
            .get(parsed)
            .header(USER_AGENT, user_agent)
            .header(ACCEPT, ACCEPT_HTML)
            .send()
            .await
            .map_err(|e| self.describe(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!(
                "HTTP {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or_default()
            )
            .trim_end()
            .to_string());
        }

        response.text().await.map_err(|e| self.describe(&e))
    }

    fn describe(&self, err: &reqwest::Error) -> String {
        if err.is_timeout() {
            format!("request timed out after {}s", self.timeout.as_secs())
        } else {
            err.to_string()
        }
    }
}

#[async_trait]
impl SourceFetch for HttpFetcher {
    async fn fetch(&self, url: &str, kind: SourceKind) -> ScrapeResult {
        tracing::debug!("Fetching {} source {}", kind, url);

        match self.fetch_body(url).await {
            Ok(html) => {
                let emails = extract_from_html(&html);
                tracing::debug!("Found {} emails on {}", emails.len(), url);
                ScrapeResult::success(url, emails)
            }
            Err(message) => {
                tracing::warn!("Failed to scrape {}: {}", url, message);
                ScrapeResult::failure(url, message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::ManualClock;
    use wiremock::matchers::{method, path};
    use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

    /// Compares the whole header value; `matchers::header` splits on commas.
    struct ExactHeader {
        name: &'static str,
        value: String,
    }

    fn exact_header(name: &'static str, value: impl Into<String>) -> ExactHeader {
        ExactHeader {
            name,
            value: value.into(),
        }
    }

    impl Match for ExactHeader {
        fn matches(&self, request: &Request) -> bool {
            request
                .headers
                .get(self.name)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v == self.value)
        }
    }

    fn fetcher_with(timeout_secs: u64, clock: Arc<ManualClock>) -> HttpFetcher {
        let config = ScrapingConfig {
            timeout_secs,
            ..ScrapingConfig::default()
        };
        let limiter = Arc::new(RateLimiter::with_clock(
            Duration::from_millis(config.request_delay_ms),
            clock,
        ));
        HttpFetcher::from_config(&config, limiter).expect("create fetcher")
    }

    #[test]
    fn test_requires_user_agents() {
        let config = ScrapingConfig {
            user_agents: Vec::new(),
            ..ScrapingConfig::default()
        };
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(10)));
        assert!(matches!(
            HttpFetcher::from_config(&config, limiter),
            Err(ScrapeError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_extracts_emails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/kontakt"))
            .and(exact_header("accept", ACCEPT_HTML))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<html><body><p>Biuro: Biuro@Firma.pl</p>
                   <a href="mailto:jan@firma.pl?subject=Oferta">Jan</a></body></html>"#,
            ))
            .mount(&server)
            .await;

        let fetcher = fetcher_with(10, Arc::new(ManualClock::new()));
        let url = format!("{}/kontakt", server.uri());
        let result = fetcher.fetch(&url, SourceKind::Website).await;

        assert!(result.succeeded);
        assert_eq!(result.source_url, url);
        assert!(result.error_message.is_none());
        assert_eq!(
            result.emails.into_iter().collect::<Vec<_>>(),
            vec!["biuro@firma.pl", "jan@firma.pl"]
        );
    }

    #[tokio::test]
    async fn test_fetch_sends_configured_user_agent() {
        let server = MockServer::start().await;
        let agent = ScrapingConfig::default().user_agents[0].clone();
        let config = ScrapingConfig {
            user_agents: vec![agent.clone()],
            ..ScrapingConfig::default()
        };
        Mock::given(method("GET"))
            .and(exact_header("user-agent", agent.clone()))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>a@b.pl</p>"))
            .expect(1)
            .mount(&server)
            .await;

        let limiter = Arc::new(RateLimiter::with_clock(
            Duration::from_millis(1),
            Arc::new(ManualClock::new()),
        ));
        let fetcher = HttpFetcher::from_config(&config, limiter).expect("create fetcher");
        let result = fetcher.fetch(&server.uri(), SourceKind::Directory).await;

        assert!(agent.contains(", like Gecko"));
        assert!(result.succeeded, "{result:?}");
    }

    #[tokio::test]
    async fn test_non_success_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = fetcher_with(10, Arc::new(ManualClock::new()));
        let result = fetcher.fetch(&server.uri(), SourceKind::Website).await;

        assert!(!result.succeeded);
        assert!(result.emails.is_empty());
        assert_eq!(result.error_message.as_deref(), Some("HTTP 404 Not Found"));
    }

    #[tokio::test]
    async fn test_timeout_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<p>late@firma.pl</p>")
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let fetcher = fetcher_with(1, Arc::new(ManualClock::new()));
        let result = fetcher.fetch(&server.uri(), SourceKind::Website).await;

        assert!(!result.succeeded);
        assert!(result.emails.is_empty());
        assert_eq!(
            result.error_message.as_deref(),
            Some("request timed out after 1s")
        );
    }

    #[tokio::test]
    async fn test_invalid_url_is_reported() {
        let fetcher = fetcher_with(10, Arc::new(ManualClock::new()));
        let result = fetcher.fetch("not a url", SourceKind::Forum).await;

        assert!(!result.succeeded);
        assert!(result
            .error_message
            .as_deref()
            .is_some_and(|m| m.starts_with("invalid URL")));
    }

    #[tokio::test]
    async fn test_same_domain_is_spaced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>x@y.pl</p>"))
            .mount(&server)
            .await;

        let clock = Arc::new(ManualClock::new());
        let fetcher = fetcher_with(10, clock.clone());

        fetcher.fetch(&server.uri(), SourceKind::Website).await;
        fetcher
            .fetch(&format!("{}/team", server.uri()), SourceKind::Website)
            .await;

        assert_eq!(clock.sleeps(), vec![Duration::from_millis(2000)]);
    }
}
