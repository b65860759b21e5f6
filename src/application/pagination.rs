//! Page-by-page fetching of paginated root fields.
//!
//! Pages are requested strictly in increasing order, starting at 1. A run
//! stops when a page comes back empty, when the paginator reports the last
//! page, or when every item on a page is older than the cutoff (that page is
//! discarded). Any page failure aborts the run and discards what was
//! accumulated, and so does a paginator reporting a page other than the one
//! requested.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use super::executor::RequestExecutor;
use crate::error::{Error, Result};

/// Largest `first:` the remote API accepts.
pub const MAX_PAGE_SIZE: u32 = 500;

/// A query that can be issued page by page.
pub trait PagedQuery: Send + Sync {
    /// Root field holding `{ data [...] paginatorInfo {...} }`.
    fn root_field(&self) -> &str;

    /// Document for one page.
    fn page_document(&self, page: u32, first: u32) -> String;

    /// Timestamp used for cutoff decisions. Items without one are never
    /// considered older than a cutoff.
    fn item_timestamp(&self, _item: &Value) -> Option<DateTime<Utc>> {
        None
    }
}

/// Progress marker for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    pub page_number: u32,
    pub last_page_known: Option<u32>,
}

impl PageCursor {
    const fn start() -> Self {
        Self {
            page_number: 1,
            last_page_known: None,
        }
    }

    fn exhausted(&self) -> bool {
        self.last_page_known.is_some_and(|last| self.page_number >= last)
    }
}

/// Options for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageOptions {
    /// Items per page; clamped to `1..=MAX_PAGE_SIZE`.
    pub page_size: u32,
    pub cutoff: Option<DateTime<Utc>>,
    /// Stop after this many pages without error.
    pub max_pages: Option<u32>,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            page_size: MAX_PAGE_SIZE,
            cutoff: None,
            max_pages: None,
        }
    }
}

impl PageOptions {
    #[must_use]
    pub fn with_cutoff(mut self, cutoff: Option<DateTime<Utc>>) -> Self {
        self.cutoff = cutoff;
        self
    }

    #[must_use]
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = Some(max_pages);
        self
    }
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EmptyPage,
    LastPage,
    Cutoff,
    MaxPages,
    Found,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaginatorInfo {
    #[serde(default)]
    current_page: Option<u32>,
    #[serde(default)]
    last_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    data: Vec<Value>,
    #[serde(default, rename = "paginatorInfo")]
    paginator_info: Option<PaginatorInfo>,
}

fn extract_page(mut data: Value, root: &str) -> Result<Page> {
    let section = data
        .get_mut(root)
        .map(Value::take)
        .ok_or_else(|| Error::Decode {
            entity: "page",
            reason: format!("response has no `{root}` field"),
        })?;
    serde_json::from_value(section).map_err(|err| Error::Decode {
        entity: "page",
        reason: err.to_string(),
    })
}

/// Drives a [`PagedQuery`] through the request executor.
#[derive(Debug, Clone)]
pub struct PaginationEngine {
    executor: Arc<RequestExecutor>,
}

impl PaginationEngine {
    #[must_use]
    pub fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    /// Every item of every page, in arrival order.
    ///
    /// # Errors
    ///
    /// The first page failure; nothing is returned in that case.
    pub async fn fetch_all_pages(
        &self,
        query: &dyn PagedQuery,
        opts: PageOptions,
    ) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        self.scan_pages(query, opts, |page| {
            items.extend(page);
            None::<()>
        })
        .await?;
        Ok(items)
    }

    /// Feed pages to `visit` until it returns a value or the run ends.
    ///
    /// # Errors
    ///
    /// The first page failure.
    pub async fn scan_pages<T, F>(
        &self,
        query: &dyn PagedQuery,
        opts: PageOptions,
        mut visit: F,
    ) -> Result<Option<T>>
    where
        F: FnMut(Vec<Value>) -> Option<T>,
    {
        let page_size = opts.page_size.clamp(1, MAX_PAGE_SIZE);
        let root = query.root_field();
        let mut cursor = PageCursor::start();
        let mut total = 0usize;

        let reason = loop {
            if opts.max_pages.is_some_and(|max| cursor.page_number > max) {
                break StopReason::MaxPages;
            }

            let document = query.page_document(cursor.page_number, page_size);
            let page = extract_page(self.executor.execute(&document).await?, root)?;
            debug!(
                root,
                page = cursor.page_number,
                items = page.data.len(),
                "Fetched page"
            );

            if page.data.is_empty() {
                break StopReason::EmptyPage;
            }

            if let Some(cutoff) = opts.cutoff {
                let all_older = page
                    .data
                    .iter()
                    .all(|item| query.item_timestamp(item).is_some_and(|ts| ts < cutoff));
                if all_older {
                    break StopReason::Cutoff;
                }
            }

            if let Some(info) = page.paginator_info {
                if let Some(current) = info.current_page.filter(|c| *c != cursor.page_number) {
                    return Err(Error::Protocol {
                        status: None,
                        message: format!(
                            "`{root}` answered page {current} for page {}",
                            cursor.page_number
                        ),
                    });
                }
                cursor.last_page_known = info.last_page;
            }
            total += page.data.len();

            if let Some(found) = visit(page.data) {
                debug!(root, page = cursor.page_number, "Scan matched");
                return Ok(Some(found));
            }

            if cursor.exhausted() {
                break StopReason::LastPage;
            }
            let Some(next) = cursor.page_number.checked_add(1) else {
                break StopReason::LastPage;
            };
            cursor.page_number = next;
        };

        info!(root, pages = cursor.page_number, items = total, ?reason, "Pagination finished");
        Ok(None)
    }
}
