//! Configuration management for the Neon Archive client core

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

use crate::models::loan::DEFAULT_LOAN_DURATION_DAYS;

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    pub search_endpoint: String,
    pub works_endpoint: String,
    pub covers_endpoint: String,
    pub search_limit: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotificationsConfig {
    /// Book-available notification endpoint; notifications are skipped
    /// entirely when unset.
    pub endpoint: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoanPolicyConfig {
    pub duration_days: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub loans: LoanPolicyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default").required(false))
            // Layer on the environment-specific file
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add environment variables (with prefix NEON_)
            .add_source(
                Environment::with_prefix("NEON")
                    .separator("_")
                    .try_parsing(true),
            )
            // Override notification endpoint from NOTIFY_ENDPOINT env var if present
            .set_override_option(
                "notifications.endpoint",
                env::var("NOTIFY_ENDPOINT").ok(),
            )?
            .build()?;

        config.try_deserialize()
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            search_endpoint: "https://openlibrary.org/search.json".to_string(),
            works_endpoint: "https://openlibrary.org".to_string(),
            covers_endpoint: "https://covers.openlibrary.org".to_string(),
            search_limit: 12,
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self { endpoint: None }
    }
}

impl Default for LoanPolicyConfig {
    fn default() -> Self {
        Self {
            duration_days: DEFAULT_LOAN_DURATION_DAYS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shipped_defaults_agree_with_builtin_defaults() {
        // config/default.toml must carry endpoint origins, not paths;
        // the catalog service appends /works/{id}.json and /b/id/... itself
        let from_file: AppConfig = Config::builder()
            .add_source(File::with_name("config/default"))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        let builtin = CatalogConfig::default();
        assert_eq!(from_file.catalog.search_endpoint, builtin.search_endpoint);
        assert_eq!(from_file.catalog.works_endpoint, builtin.works_endpoint);
        assert_eq!(from_file.catalog.covers_endpoint, builtin.covers_endpoint);
        assert_eq!(from_file.loans.duration_days, LoanPolicyConfig::default().duration_days);
    }
}
