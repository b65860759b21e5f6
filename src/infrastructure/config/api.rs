//! Remote API connection settings.

use std::time::Duration;

use serde::Deserialize;

use crate::application::executor::{ExecutorSettings, RetryPolicy};

/// GraphQL endpoint and request pacing.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Per-request timeout (milliseconds).
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// TCP connect timeout (milliseconds).
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Minimum gap between two requests (milliseconds).
    #[serde(default = "default_min_request_interval_ms")]
    pub min_request_interval_ms: u64,
    /// Window in which identical documents share one response (seconds).
    #[serde(default = "default_dedupe_ttl_secs")]
    pub dedupe_ttl_secs: u64,
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_endpoint() -> String {
    "https://api.politicsandwar.com/graphql".into()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_min_request_interval_ms() -> u64 {
    250
}

fn default_dedupe_ttl_secs() -> u64 {
    5
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_ms: default_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            min_request_interval_ms: default_min_request_interval_ms(),
            dedupe_ttl_secs: default_dedupe_ttl_secs(),
            retry: RetryConfig::default(),
        }
    }
}

impl ApiConfig {
    #[must_use]
    pub fn executor_settings(&self) -> ExecutorSettings {
        ExecutorSettings {
            timeout: Duration::from_millis(self.timeout_ms),
            min_interval: Duration::from_millis(self.min_request_interval_ms),
            dedupe_ttl: Duration::from_secs(self.dedupe_ttl_secs),
            retry: self.retry.policy(),
        }
    }

    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Retry policy for lookups that opt in.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each further attempt.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.base_delay_ms))
    }
}
