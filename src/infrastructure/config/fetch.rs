//! Batching, concurrency and pagination limits.

use std::time::Duration;

use serde::Deserialize;

use crate::application::pagination::MAX_PAGE_SIZE;

/// Largest accepted `max_ids_per_query`.
pub const MAX_IDS_PER_QUERY: usize = 25;

/// Composite query limits.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_max_ids_per_query")]
    pub max_ids_per_query: usize,
}

fn default_max_ids_per_query() -> usize {
    5
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_ids_per_query: default_max_ids_per_query(),
        }
    }
}

/// Concurrent fetch limits.
#[derive(Debug, Clone, Deserialize)]
pub struct ConcurrencyConfig {
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Delay between dispatching two tasks (milliseconds).
    #[serde(default = "default_inter_task_delay_ms")]
    pub inter_task_delay_ms: u64,
}

fn default_max_concurrent() -> usize {
    3
}

fn default_inter_task_delay_ms() -> u64 {
    1500
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            inter_task_delay_ms: default_inter_task_delay_ms(),
        }
    }
}

impl ConcurrencyConfig {
    #[must_use]
    pub const fn inter_task_delay(&self) -> Duration {
        Duration::from_millis(self.inter_task_delay_ms)
    }
}

/// Pagination limits.
#[derive(Debug, Clone, Deserialize)]
pub struct PaginationConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Page cap for identifier table scans.
    #[serde(default = "default_max_scan_pages")]
    pub max_scan_pages: u32,
}

fn default_page_size() -> u32 {
    MAX_PAGE_SIZE
}

fn default_max_scan_pages() -> u32 {
    40
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_scan_pages: default_max_scan_pages(),
        }
    }
}
