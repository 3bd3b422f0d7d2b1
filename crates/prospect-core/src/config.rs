//! Configuration management for Prospect.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable holding the generative provider API key.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Main application configuration.
///
/// This is loaded from `~/.config/prospect/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Fetching, batching and yield settings
    pub scraping: ScrapingConfig,
    /// Generative text provider settings
    pub llm: LlmConfig,
    /// Subscriber store settings
    pub database: DatabaseConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path, falling back to defaults if absent.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            tracing::debug!("Loading config from {}", path.display());
            let contents = fs::read_to_string(path)?;
            let config: Self = toml::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `OPENAI_API_KEY`: Provider API key (never read from the config file)
    /// - `PROSPECT_LLM_MODEL`: Override the completion model
    /// - `PROSPECT_CONCURRENCY`: Override the fetch batch size
    /// - `PROSPECT_REQUEST_DELAY_MS`: Override the per-domain delay
    /// - `PROSPECT_DATABASE_PATH`: Override the SQLite database path
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply the supported environment variable overrides in place.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(OPENAI_API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.llm.api_key = Some(key);
            }
        }

        if let Ok(model) = std::env::var("PROSPECT_LLM_MODEL") {
            tracing::debug!("Override llm.model from env: {}", model);
            self.llm.model = model;
        }

        if let Ok(val) = std::env::var("PROSPECT_CONCURRENCY") {
            if let Ok(concurrency) = val.parse() {
                self.scraping.concurrency = concurrency;
                tracing::debug!("Override scraping.concurrency from env: {}", concurrency);
            }
        }

        if let Ok(val) = std::env::var("PROSPECT_REQUEST_DELAY_MS") {
            if let Ok(delay) = val.parse() {
                self.scraping.request_delay_ms = delay;
                tracing::debug!("Override scraping.request_delay_ms from env: {}", delay);
            }
        }

        if let Ok(path) = std::env::var("PROSPECT_DATABASE_PATH") {
            tracing::debug!("Override database.path from env: {}", path);
            self.database.path = Some(PathBuf::from(path));
        }
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.scraping.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scraping.concurrency".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.scraping.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scraping.timeout_secs".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.scraping.user_agents.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "scraping.user_agents".to_string(),
                reason: "at least one user agent is required".to_string(),
            });
        }
        Ok(())
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to an explicit path.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        let config_dir = path.parent().ok_or_else(|| ConfigError::InvalidValue {
            field: "config_path".to_string(),
            reason: "no parent directory".to_string(),
        })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/prospect/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("com", "prospect", "prospect").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path.
    ///
    /// Uses XDG base directories: `~/.local/share/prospect`
    pub fn data_dir() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("com", "prospect", "prospect").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.data_dir().to_path_buf())
    }

    /// Resolve the database path, defaulting into the data directory.
    pub fn database_path(&self) -> ConfigResult<PathBuf> {
        match &self.database.path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("prospect.db")),
        }
    }
}

/// Fetching, batching and yield settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    /// Number of sources fetched concurrently per batch
    pub concurrency: usize,
    /// Minimum delay between requests to one domain, also used between batches
    pub request_delay_ms: u64,
    /// Hard timeout for a single page fetch
    pub timeout_secs: u64,
    /// How many ranked sources the trigger returns as a preview
    pub preview_limit: usize,
    /// Minimum email count used when a request does not specify one
    pub default_min_emails: usize,
    /// Desktop browser user agents; one is picked per fetch
    pub user_agents: Vec<String>,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            request_delay_ms: 2000,
            timeout_secs: 10,
            preview_limit: 10,
            default_min_emails: 10_000,
            user_agents: vec![
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            ],
        }
    }
}

/// Generative text provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Chat completion model
    pub model: String,
    /// API base URL (OpenAI-compatible)
    pub base_url: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens for completions
    pub max_tokens: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// API key, taken from `OPENAI_API_KEY` and never written to disk
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl LlmConfig {
    /// Return the API key or a `MissingCredential` error.
    pub fn require_api_key(&self) -> ConfigResult<&str> {
        self.api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingCredential {
                name: OPENAI_API_KEY_ENV.to_string(),
            })
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4-turbo-preview".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            temperature: 0.7,
            max_tokens: 2048,
            timeout_secs: 60,
            api_key: None,
        }
    }
}

/// Subscriber store settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file; defaults to `<data dir>/prospect.db`
    pub path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.scraping.concurrency, 5);
        assert_eq!(config.scraping.request_delay_ms, 2000);
        assert_eq!(config.scraping.timeout_secs, 10);
        assert_eq!(config.scraping.default_min_emails, 10_000);
        assert_eq!(config.llm.model, "gpt-4-turbo-preview");
        assert!(config.llm.api_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization_skips_api_key() {
        let mut config = AppConfig::default();
        config.llm.api_key = Some("sk-secret".to_string());

        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("[scraping]"));
        assert!(toml_str.contains("[llm]"));
        assert!(!toml_str.contains("sk-secret"));

        let parsed: AppConfig = toml::from_str(&toml_str).expect("parse serialized config");
        assert_eq!(parsed.scraping.concurrency, config.scraping.concurrency);
        assert!(parsed.llm.api_key.is_none());
    }

    #[test]
    fn test_config_save_load() {
        let tmp = TempDir::new().expect("create temp dir");
        let config_path = tmp.path().join("nested").join("config.toml");

        let mut config = AppConfig::default();
        config.scraping.concurrency = 3;
        config.database.path = Some(tmp.path().join("leads.db"));

        config.save_to(&config_path).expect("save config");
        let loaded = AppConfig::load_from(&config_path).expect("load config");

        assert_eq!(loaded.scraping.concurrency, 3);
        assert_eq!(loaded.database.path, Some(tmp.path().join("leads.db")));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let tmp = TempDir::new().expect("create temp dir");
        let loaded = AppConfig::load_from(&tmp.path().join("absent.toml")).expect("load");
        assert_eq!(loaded.scraping.concurrency, 5);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[scraping]
concurrency = 2

[llm]
model = "gpt-4o-mini"
"#;

        let config: AppConfig = toml::from_str(toml_str).expect("parse partial config");
        assert_eq!(config.scraping.concurrency, 2);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        // These should be defaults
        assert_eq!(config.scraping.request_delay_ms, 2000);
        assert_eq!(config.llm.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let tmp = TempDir::new().expect("create temp dir");
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[scraping]\nconcurrency = 0\n").expect("write config");

        let err = AppConfig::load_from(&path).expect_err("zero concurrency must fail");
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_require_api_key() {
        let mut llm = LlmConfig::default();
        assert!(matches!(
            llm.require_api_key(),
            Err(ConfigError::MissingCredential { .. })
        ));

        llm.api_key = Some("   ".to_string());
        assert!(llm.require_api_key().is_err());

        llm.api_key = Some("sk-test".to_string());
        assert_eq!(llm.require_api_key().expect("key present"), "sk-test");
    }

    #[test]
    fn test_database_path_override() {
        let mut config = AppConfig::default();
        config.database.path = Some(PathBuf::from("/tmp/prospect-test.db"));
        assert_eq!(
            config.database_path().expect("resolve path"),
            PathBuf::from("/tmp/prospect-test.db")
        );
    }
}
