//! Cache location and freshness windows.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Persisted cache settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Record directory. Defaults to the platform cache directory.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    /// Freshness window for entity datasets (seconds).
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Freshness window for resolved identifiers (seconds).
    #[serde(default = "default_identifier_ttl_secs")]
    pub identifier_ttl_secs: u64,
    /// Freshness window for trade prices (seconds).
    #[serde(default = "default_trade_price_ttl_secs")]
    pub trade_price_ttl_secs: u64,
}

fn default_ttl_secs() -> u64 {
    3600 // 1 hour
}

fn default_identifier_ttl_secs() -> u64 {
    86_400 // 1 day
}

fn default_trade_price_ttl_secs() -> u64 {
    900 // 15 minutes
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: None,
            ttl_secs: default_ttl_secs(),
            identifier_ttl_secs: default_identifier_ttl_secs(),
            trade_price_ttl_secs: default_trade_price_ttl_secs(),
        }
    }
}

impl CacheConfig {
    /// Configured directory, else `<platform cache>/orbis-gateway`, else `./cache`.
    #[must_use]
    pub fn resolved_directory(&self) -> PathBuf {
        self.directory.clone().unwrap_or_else(|| {
            dirs::cache_dir().map_or_else(
                || PathBuf::from("cache"),
                |dir| dir.join("orbis-gateway"),
            )
        })
    }

    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    #[must_use]
    pub const fn identifier_ttl(&self) -> Duration {
        Duration::from_secs(self.identifier_ttl_secs)
    }

    #[must_use]
    pub const fn trade_price_ttl(&self) -> Duration {
        Duration::from_secs(self.trade_price_ttl_secs)
    }
}
