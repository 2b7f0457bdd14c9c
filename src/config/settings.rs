//! Application settings and configuration
//!
//! This module provides configuration management for the application,
//! loading settings from environment variables with sensible defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

use crate::config::environment::{Environment, DEFAULT_REGION, DEFAULT_TABLE_BASE_NAME};

/// Main application settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    // App settings
    pub app_name: String,
    pub app_version: String,
    pub environment: Environment,
    pub log_level: String,

    // AWS settings
    pub aws_region: String,
    pub dynamodb_endpoint_url: Option<String>,

    // Table naming
    pub table_base_name: String,
    /// Explicit table name; bypasses `<base>-<environment>` naming
    pub table_name: Option<String>,

    // Capacity overrides (None = use the environment's profile)
    pub read_capacity_units: Option<u32>,
    pub write_capacity_units: Option<u32>,

    // Request handling
    pub request_timeout_seconds: u64,
    pub max_retries: u32,

    /// Let `create` replace an existing roast instead of failing
    pub allow_overwrite: bool,
}

impl Settings {
    /// Load settings from environment variables with defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let environment = env_or_default("ENVIRONMENT", "development")
            .parse::<Environment>()
            .context("Invalid ENVIRONMENT value")?;

        let settings = Self {
            // App settings
            app_name: env_or_default("APP_NAME", "coffee-roast-store"),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            environment,
            log_level: env_or_default("LOG_LEVEL", "info"),

            // AWS settings
            aws_region: env_or_default("AWS_REGION", DEFAULT_REGION),
            dynamodb_endpoint_url: env::var("DYNAMODB_ENDPOINT_URL").ok(),

            // Table naming
            table_base_name: env_or_default("TABLE_BASE_NAME", DEFAULT_TABLE_BASE_NAME),
            table_name: env::var("TABLE_NAME_COFFEE_BEAN").ok(),

            // Capacity overrides
            read_capacity_units: env_parse("READ_CAPACITY_UNITS")?,
            write_capacity_units: env_parse("WRITE_CAPACITY_UNITS")?,

            // Request handling
            request_timeout_seconds: env_or_default("DYNAMODB_TIMEOUT_SECS", "5")
                .parse()
                .context("Invalid DYNAMODB_TIMEOUT_SECS value")?,
            max_retries: env_or_default("DYNAMODB_MAX_RETRIES", "3")
                .parse()
                .context("Invalid DYNAMODB_MAX_RETRIES value")?,

            allow_overwrite: env_or_default("ALLOW_OVERWRITE", "false")
                .parse()
                .unwrap_or(false),
        };

        settings.validate()?;

        Ok(settings)
    }

    /// Validate settings
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_seconds == 0 {
            anyhow::bail!("Request timeout must be > 0");
        }

        if self.table_base_name.trim().is_empty() {
            anyhow::bail!("Table base name cannot be empty");
        }

        if matches!(self.table_name.as_deref(), Some(name) if name.trim().is_empty()) {
            anyhow::bail!("Table name override cannot be empty");
        }

        if self.read_capacity_units == Some(0) || self.write_capacity_units == Some(0) {
            anyhow::bail!("Capacity units must be > 0");
        }

        Ok(())
    }

    /// Settings that are valid but risky. Logged once tracing is up.
    pub fn warnings(&self) -> Vec<&'static str> {
        let mut warnings = Vec::new();
        if self.is_production() && self.allow_overwrite {
            warnings.push("Overwriting existing roasts is enabled in production");
        }
        warnings
    }

    /// Check if running in production mode
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "coffee-roast-store".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: Environment::Development,
            log_level: "info".to_string(),
            aws_region: DEFAULT_REGION.to_string(),
            dynamodb_endpoint_url: None,
            table_base_name: DEFAULT_TABLE_BASE_NAME.to_string(),
            table_name: None,
            read_capacity_units: None,
            write_capacity_units: None,
            request_timeout_seconds: 5,
            max_retries: 3,
            allow_overwrite: false,
        }
    }
}

/// Helper function to get environment variable with default
fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an optional environment variable, failing on malformed values
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("Invalid {} value: {}", key, raw)),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.app_name, "coffee-roast-store");
        assert_eq!(settings.environment, Environment::Development);
        assert_eq!(settings.aws_region, "ap-southeast-1");
        assert_eq!(settings.table_base_name, "coffee-bean-data");
        assert_eq!(settings.request_timeout_seconds, 5);
        assert!(!settings.allow_overwrite);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let settings = Settings {
            request_timeout_seconds: 0,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let settings = Settings {
            write_capacity_units: Some(0),
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_table_name() {
        let settings = Settings {
            table_name: Some("  ".to_string()),
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_overwrite_in_production_is_flagged() {
        let settings = Settings {
            environment: Environment::Production,
            allow_overwrite: true,
            ..Settings::default()
        };
        assert!(settings.validate().is_ok());
        assert_eq!(
            settings.warnings(),
            vec!["Overwriting existing roasts is enabled in production"]
        );

        let staging = Settings {
            environment: Environment::Staging,
            ..settings.clone()
        };
        assert!(staging.warnings().is_empty());
        assert!(Settings::default().warnings().is_empty());
    }

    #[test]
    fn test_env_parse_missing_is_none() {
        let value: Option<u32> = env_parse("COFFEE_ROAST_STORE_TEST_UNSET_VARIABLE").unwrap();
        assert!(value.is_none());
    }
}
