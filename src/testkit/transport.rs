//! Closure-driven GraphQL transport.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::time::Instant;

use crate::error::Result;
use crate::port::GraphqlTransport;

type Responder = dyn Fn(&str, usize) -> Result<Value> + Send + Sync;

/// One document received by a [`ScriptedTransport`].
#[derive(Debug, Clone)]
pub struct SentRequest {
    pub document: String,
    /// Tokio instant, so paused-clock tests can measure spacing.
    pub at: Instant,
}

/// A transport whose responses come from a closure.
///
/// The closure receives the document and the zero-based index of the
/// request and returns the full response body (see
/// [`data_response`](super::data_response)) or an error.
pub struct ScriptedTransport {
    responder: Box<Responder>,
    latency: Duration,
    sent: Mutex<Vec<SentRequest>>,
    count: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str, usize) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            latency: Duration::ZERO,
            sent: Mutex::new(Vec::new()),
            count: AtomicUsize::new(0),
        }
    }

    /// Replay `bodies` in order; the last one repeats once exhausted.
    pub fn sequence(bodies: Vec<Value>) -> Self {
        Self::new(move |_, n| {
            Ok(bodies
                .get(n)
                .or_else(|| bodies.last())
                .cloned()
                .unwrap_or(Value::Null))
        })
    }

    /// Delay every response by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn request_count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<SentRequest> {
        self.sent.lock().clone()
    }

    pub fn documents(&self) -> Vec<String> {
        self.sent.lock().iter().map(|r| r.document.clone()).collect()
    }
}

#[async_trait]
impl GraphqlTransport for ScriptedTransport {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn post(&self, document: &str, _timeout: Duration) -> Result<Value> {
        let index = self.count.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().push(SentRequest {
            document: document.to_string(),
            at: Instant::now(),
        });
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        (self.responder)(document, index)
    }
}
