//! Request executor.
//!
//! The single path every GraphQL document takes to the network:
//!
//! 1. recent identical responses are served from the dedupe window,
//! 2. identical in-flight documents wait for the first sender,
//! 3. the global rate limiter spaces out sends,
//! 4. each send carries its own timeout,
//! 5. a non-empty `errors` array fails the request.
//!
//! Retry is opt-in through [`RequestExecutor::execute_with_retry`].

mod dedup;
mod rate_limit;
mod retry;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};

pub use dedup::{query_hash, ResponseDeduplicator};
pub use rate_limit::RateLimiter;
pub use retry::RetryPolicy;

use super::singleflight::KeyedLocks;
use crate::error::{Error, Result};
use crate::port::{GraphqlEnvelope, GraphqlTransport};

/// Executor settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorSettings {
    pub timeout: Duration,
    pub min_interval: Duration,
    pub dedupe_ttl: Duration,
    pub retry: RetryPolicy,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            min_interval: Duration::from_millis(250),
            dedupe_ttl: Duration::from_secs(5),
            retry: RetryPolicy::default(),
        }
    }
}

/// Rate-limited, deduplicated GraphQL executor.
pub struct RequestExecutor {
    transport: Arc<dyn GraphqlTransport>,
    limiter: RateLimiter,
    dedup: ResponseDeduplicator,
    in_flight: KeyedLocks<u64>,
    timeout: Duration,
    retry: RetryPolicy,
    requests_sent: AtomicU64,
}

impl RequestExecutor {
    #[must_use]
    pub fn new(transport: Arc<dyn GraphqlTransport>, settings: ExecutorSettings) -> Self {
        Self {
            transport,
            limiter: RateLimiter::new(settings.min_interval),
            dedup: ResponseDeduplicator::new(settings.dedupe_ttl),
            in_flight: KeyedLocks::new(),
            timeout: settings.timeout,
            retry: settings.retry,
            requests_sent: AtomicU64::new(0),
        }
    }

    /// Send `document` and return the `data` member of the response.
    ///
    /// # Errors
    ///
    /// Transport, protocol and remote API failures; see [`Error`].
    pub async fn execute(&self, document: &str) -> Result<Value> {
        self.execute_with_timeout(document, self.timeout).await
    }

    /// [`execute`](Self::execute) with a per-call timeout.
    ///
    /// # Errors
    ///
    /// As [`execute`](Self::execute).
    pub async fn execute_with_timeout(&self, document: &str, timeout: Duration) -> Result<Value> {
        let hash = query_hash(document);
        if let Some(cached) = self.dedup.get(hash) {
            debug!(query_hash = hash, "Serving deduplicated response");
            return Ok(cached);
        }

        let _flight = self.in_flight.lock(hash).await;
        if let Some(cached) = self.dedup.get(hash) {
            debug!(query_hash = hash, "Serving response from concurrent request");
            return Ok(cached);
        }

        self.limiter.acquire().await;
        let sent = self.requests_sent.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(
            transport = self.transport.name(),
            query_hash = hash,
            request = sent,
            "Sending GraphQL request"
        );

        let body = match tokio::time::timeout(timeout, self.transport.post(document, timeout)).await
        {
            Ok(body) => body?,
            Err(_) => {
                return Err(Error::timeout(format!(
                    "request timed out after {}ms",
                    timeout.as_millis()
                )))
            }
        };

        let data = GraphqlEnvelope::from_value(body)?.into_data()?;
        self.dedup.insert(hash, data.clone());
        Ok(data)
    }

    /// [`execute`](Self::execute) wrapped in the configured retry policy.
    ///
    /// # Errors
    ///
    /// The last error once attempts run out, or the first permanent error.
    pub async fn execute_with_retry(&self, label: &str, document: &str) -> Result<Value> {
        let data = self.retry.run(label, move || self.execute(document)).await?;
        info!(operation = label, "Request succeeded");
        Ok(data)
    }

    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Network requests actually sent, excluding deduplicated ones.
    #[must_use]
    pub fn requests_sent(&self) -> u64 {
        self.requests_sent.load(Ordering::Relaxed)
    }

    /// Forget every deduplicated response.
    pub fn clear_dedupe(&self) {
        self.dedup.clear();
    }
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("transport", &self.transport.name())
            .field("limiter", &self.limiter)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .field("requests_sent", &self.requests_sent())
            .finish_non_exhaustive()
    }
}
