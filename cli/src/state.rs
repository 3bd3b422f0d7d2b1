//! Application state management.

use crate::error::CommandError;
use prospect_core::{AppConfig, ConfigError, ConfigResult};
use prospect_db::Database;
use prospect_scraper::ScrapeService;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// State shared by every command of one CLI invocation.
pub struct AppState {
    /// Effective configuration (file, env overrides, flags)
    pub config: AppConfig,
    /// Migrated subscriber database
    pub db: Arc<Database>,
}

impl AppState {
    /// Open the configured database and run migrations.
    pub async fn initialize(config: AppConfig) -> Result<Self, CommandError> {
        let db_path = config.database_path()?;
        tracing::info!("Database: {}", db_path.display());

        let db = Database::open_and_migrate(&db_path).await?;
        Ok(Self::from_parts(config, Arc::new(db)))
    }

    /// Build state around an already opened database.
    #[must_use]
    pub fn from_parts(config: AppConfig, db: Arc<Database>) -> Self {
        Self { config, db }
    }

    /// A scrape service backed by the configured provider and this database.
    ///
    /// Fails when no API key is configured.
    pub fn scrape_service(&self) -> Result<ScrapeService, CommandError> {
        let store = Arc::clone(&self.db);
        Ok(ScrapeService::from_config(&self.config, store)?)
    }
}

/// Load configuration from `path` (or the default location), then apply
/// environment overrides and an optional database override.
pub fn load_config(path: Option<&Path>, database: Option<PathBuf>) -> ConfigResult<AppConfig> {
    let mut config = match path {
        Some(path) => {
            if !path.exists() {
                return Err(ConfigError::NotFound {
                    path: path.display().to_string(),
                });
            }
            AppConfig::load_from(path)?
        }
        None => AppConfig::load()?,
    };

    config.apply_env_overrides();
    if let Some(database) = database {
        config.database.path = Some(database);
    }
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_config_from_explicit_path() {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[scraping]\nconcurrency = 3\n").expect("write config");

        let config = load_config(Some(&path), None).expect("load config");
        assert_eq!(config.scraping.concurrency, 3);
    }

    #[test]
    fn test_load_config_missing_explicit_path() {
        let dir = TempDir::new().expect("create temp dir");
        let result = load_config(Some(&dir.path().join("absent.toml")), None);
        assert!(matches!(result, Err(ConfigError::NotFound { .. })));
    }

    #[test]
    fn test_database_flag_overrides_config() {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[database]\npath = \"/tmp/elsewhere.db\"\n").expect("write config");

        let db_path = dir.path().join("prospect.db");
        let config = load_config(Some(&path), Some(db_path.clone())).expect("load config");
        assert_eq!(config.database_path().expect("path"), db_path);
    }

    #[tokio::test]
    async fn test_initialize_creates_database() {
        let dir = TempDir::new().expect("create temp dir");
        let mut config = AppConfig::default();
        config.database.path = Some(dir.path().join("nested").join("prospect.db"));

        let state = AppState::initialize(config).await.expect("initialize");
        assert!(state.db.get_schema_version().await.expect("version") > 0);
        assert!(dir.path().join("nested").join("prospect.db").exists());
    }

    #[tokio::test]
    async fn test_scrape_service_requires_api_key() {
        let db = Database::open_and_migrate(":memory:").await.expect("open db");
        let mut config = AppConfig::default();
        config.llm.api_key = None;
        let state = AppState::from_parts(config, Arc::new(db));

        let err = state.scrape_service().err().expect("missing key");
        assert_eq!(err.code, "CONFIGURATION_ERROR");
    }
}
