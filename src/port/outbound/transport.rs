//! GraphQL transport port.
//!
//! A transport sends one query document and returns the raw response
//! envelope. Interpreting the envelope (`data` versus `errors`) is the
//! request executor's job, so transports stay dumb and easy to script.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// Sends GraphQL documents to the remote endpoint.
///
/// # Errors
///
/// Implementations return [`Error::Transport`](crate::error::Error::Transport)
/// for network failures and timeouts and
/// [`Error::Protocol`](crate::error::Error::Protocol) for non-2xx statuses or
/// bodies that are not JSON.
#[async_trait]
pub trait GraphqlTransport: Send + Sync {
    /// Short name for logging.
    fn name(&self) -> &'static str;

    /// POST `{"query": document}` and return the decoded response body.
    async fn post(&self, document: &str, timeout: Duration) -> Result<Value>;
}

/// One entry of a GraphQL `errors` array.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphqlError {
    #[serde(default)]
    pub message: String,
}

/// Response envelope: `{"data": ..., "errors": [...]}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphqlEnvelope {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub errors: Vec<GraphqlError>,
}

impl GraphqlEnvelope {
    /// Decode a raw response body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] when the body is not an envelope object.
    pub fn from_value(body: Value) -> Result<Self> {
        if !body.is_object() {
            return Err(Error::Protocol {
                status: None,
                message: format!("response body is not a JSON object: {body}"),
            });
        }
        serde_json::from_value(body).map_err(|err| Error::Protocol {
            status: None,
            message: format!("malformed response envelope: {err}"),
        })
    }

    /// The `data` member, failing on any reported error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RemoteApi`] with the first message when `errors` is
    /// non-empty, even if `data` is partially populated, and
    /// [`Error::Protocol`] when `data` is absent.
    pub fn into_data(self) -> Result<Value> {
        if let Some(first) = self.errors.first() {
            return Err(Error::RemoteApi {
                message: first.message.clone(),
                error_count: self.errors.len(),
            });
        }
        match self.data {
            Some(Value::Null) | None => Err(Error::Protocol {
                status: None,
                message: "response carried neither data nor errors".into(),
            }),
            Some(data) => Ok(data),
        }
    }
}
