//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all gateway settings.
//! Configuration is loaded from a TOML file; the API key is only ever read
//! from the `PNW_API_KEY` environment variable.
//!
//! # Example
//!
//! ```no_run
//! use orbis_gateway::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::path::Path;

use chrono::FixedOffset;
use serde::Deserialize;

use super::api::ApiConfig;
use super::cache::CacheConfig;
use super::fetch::{BatchConfig, ConcurrencyConfig, PaginationConfig, MAX_IDS_PER_QUERY};
use super::logging::LoggingConfig;
use super::resolver::ResolverConfig;
use crate::application::pagination::MAX_PAGE_SIZE;
use crate::application::resolver::ResolverSettings;
use crate::application::GatewaySettings;
use crate::domain::time::parse_offset;
use crate::error::{ConfigError, Result};

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "PNW_API_KEY";

/// Main gateway configuration.
///
/// Every section is optional; an empty file yields the defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Endpoint, timeouts, pacing and retry.
    #[serde(default)]
    pub api: ApiConfig,

    /// Cache directory and freshness windows.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Composite query size.
    #[serde(default)]
    pub batch: BatchConfig,

    /// Concurrent fetch limits.
    #[serde(default)]
    pub concurrency: ConcurrencyConfig,

    /// Page size and scan caps.
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Identifier resolution order.
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Offset used for naive API timestamps: `UTC`, `Z` or `+02:00`.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Logging and tracing configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Loaded from `PNW_API_KEY`, never from the file.
    #[serde(skip)]
    pub api_key: Option<String>,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            cache: CacheConfig::default(),
            batch: BatchConfig::default(),
            concurrency: ConcurrencyConfig::default(),
            pagination: PaginationConfig::default(),
            resolver: ResolverConfig::default(),
            timezone: default_timezone(),
            logging: LoggingConfig::default(),
            api_key: None,
        }
    }
}

fn invalid(field: &'static str, reason: &str) -> crate::error::Error {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
    .into()
}

impl Config {
    /// Parse configuration from TOML content.
    ///
    /// Loads the API key from the `PNW_API_KEY` environment variable.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The TOML content is malformed
    /// - Validation fails (e.g., a zero batch size)
    #[allow(clippy::result_large_err)]
    pub fn parse_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;

        // Credentials never come from the config file.
        config.api_key = std::env::var(API_KEY_ENV)
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The TOML content is malformed
    /// - Validation fails
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingField`] or [`ConfigError::InvalidValue`] naming
    /// the first offending field.
    #[allow(clippy::result_large_err)]
    pub fn validate(&self) -> Result<()> {
        if self.api.endpoint.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "endpoint" }.into());
        }
        if self.api.timeout_ms == 0 {
            return Err(invalid("timeout_ms", "must be greater than 0"));
        }
        if self.api.connect_timeout_ms == 0 {
            return Err(invalid("connect_timeout_ms", "must be greater than 0"));
        }
        if self.api.retry.max_attempts == 0 {
            return Err(invalid("max_attempts", "must be greater than 0"));
        }

        if self.batch.max_ids_per_query == 0 || self.batch.max_ids_per_query > MAX_IDS_PER_QUERY {
            return Err(ConfigError::InvalidValue {
                field: "max_ids_per_query",
                reason: format!("must be between 1 and {MAX_IDS_PER_QUERY}"),
            }
            .into());
        }
        if self.concurrency.max_concurrent == 0 {
            return Err(invalid("max_concurrent", "must be greater than 0"));
        }
        if self.pagination.page_size == 0 || self.pagination.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::InvalidValue {
                field: "page_size",
                reason: format!("must be between 1 and {MAX_PAGE_SIZE}"),
            }
            .into());
        }
        if self.pagination.max_scan_pages == 0 {
            return Err(invalid("max_scan_pages", "must be greater than 0"));
        }

        if self.resolver.strategies.is_empty() {
            return Err(invalid("strategies", "at least one strategy is required"));
        }
        for (i, strategy) in self.resolver.strategies.iter().enumerate() {
            if self.resolver.strategies[..i].contains(strategy) {
                return Err(ConfigError::InvalidValue {
                    field: "strategies",
                    reason: format!("{strategy:?} listed more than once"),
                }
                .into());
            }
        }

        self.local_offset()?;

        if !self.logging.is_known_format() {
            return Err(ConfigError::InvalidValue {
                field: "format",
                reason: format!("unknown logging format {:?}", self.logging.format),
            }
            .into());
        }

        Ok(())
    }

    /// The API key, required to talk to the remote API.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingField`] when `PNW_API_KEY` is unset or empty.
    #[allow(clippy::result_large_err)]
    pub fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingField { field: API_KEY_ENV }.into())
    }

    /// The configured timezone as a fixed offset.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidValue`] for an unrecognised timezone.
    #[allow(clippy::result_large_err)]
    pub fn local_offset(&self) -> Result<FixedOffset> {
        parse_offset(&self.timezone).ok_or_else(|| {
            ConfigError::InvalidValue {
                field: "timezone",
                reason: format!(
                    "expected UTC, Z or an offset like +02:00, got {:?}",
                    self.timezone
                ),
            }
            .into()
        })
    }

    /// Settings for [`GatewayBuilder`](crate::application::GatewayBuilder).
    ///
    /// # Errors
    ///
    /// As [`local_offset`](Self::local_offset).
    #[allow(clippy::result_large_err)]
    pub fn gateway_settings(&self) -> Result<GatewaySettings> {
        Ok(GatewaySettings {
            executor: self.api.executor_settings(),
            resolver: ResolverSettings {
                strategies: self.resolver.strategies.clone(),
                identifier_ttl: self.cache.identifier_ttl(),
                page_size: self.pagination.page_size,
                max_scan_pages: self.pagination.max_scan_pages,
            },
            max_ids_per_query: self.batch.max_ids_per_query,
            max_concurrent: self.concurrency.max_concurrent,
            inter_task_delay: self.concurrency.inter_task_delay(),
            cache_ttl: self.cache.ttl(),
            trade_price_ttl: self.cache.trade_price_ttl(),
            page_size: self.pagination.page_size,
            local_offset: self.local_offset()?,
        })
    }

    /// Initialize logging based on configuration.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}
