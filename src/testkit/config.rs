//! Canonical test configurations.
//!
//! Single source of truth for settings used across tests, so no test module
//! defines its own slightly-different defaults.

use std::time::Duration;

use chrono::{Offset, Utc};

use crate::application::executor::{ExecutorSettings, RetryPolicy};
use crate::application::resolver::ResolverSettings;
use crate::application::GatewaySettings;
use crate::domain::Strategy;
use crate::infrastructure::config::Config;

/// Gateway settings without pacing, dedupe or stagger delays.
///
/// Retries keep a short backoff so retry paths stay observable.
pub fn gateway_settings() -> GatewaySettings {
    GatewaySettings {
        executor: ExecutorSettings {
            timeout: Duration::from_secs(5),
            min_interval: Duration::ZERO,
            dedupe_ttl: Duration::ZERO,
            retry: RetryPolicy::new(3, Duration::from_millis(10)),
        },
        resolver: ResolverSettings {
            strategies: Strategy::DEFAULT_ORDER.to_vec(),
            identifier_ttl: Duration::from_secs(86_400),
            page_size: 500,
            max_scan_pages: 5,
        },
        max_ids_per_query: 5,
        max_concurrent: 3,
        inter_task_delay: Duration::ZERO,
        cache_ttl: Duration::from_secs(3600),
        trade_price_ttl: Duration::from_secs(900),
        page_size: 500,
        local_offset: Utc.fix(),
    }
}

/// Default configuration with a fake API key.
pub fn config() -> Config {
    Config {
        api_key: Some("test-key".into()),
        ..Config::default()
    }
}
