//! Reqwest-backed GraphQL transport.
//!
//! One client (and so one keep-alive connection pool) is reused for every
//! request. The API key travels as the `api_key` query parameter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde_json::{json, Value};
use tracing::{debug, warn};
use url::Url;

use crate::error::{ConfigError, Error, Result};
use crate::port::GraphqlTransport;

/// Longest response excerpt carried in a protocol error.
const BODY_EXCERPT_CHARS: usize = 200;

/// HTTP client for the remote GraphQL endpoint.
pub struct HttpTransport {
    http: HttpClient,
    /// Endpoint including the `api_key` parameter; never logged.
    url: Url,
    /// Endpoint without credentials, for logs.
    endpoint: String,
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= BODY_EXCERPT_CHARS {
        return trimmed.to_string();
    }
    let mut cut: String = trimmed.chars().take(BODY_EXCERPT_CHARS).collect();
    cut.push('…');
    cut
}

impl HttpTransport {
    /// Transport with default client timeouts.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingField`] for an empty key and
    /// [`Error::Url`] for an unparseable endpoint.
    pub fn new(endpoint: &str, api_key: &str) -> Result<Self> {
        Self::with_timeouts(endpoint, api_key, Duration::from_secs(10))
    }

    /// Transport whose client uses `connect_timeout`. Request timeouts are
    /// given per call.
    ///
    /// # Errors
    ///
    /// As [`new`](Self::new).
    pub fn with_timeouts(endpoint: &str, api_key: &str, connect_timeout: Duration) -> Result<Self> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(ConfigError::MissingField {
                field: "PNW_API_KEY",
            }
            .into());
        }

        let base = Url::parse(endpoint.trim())?;
        let mut url = base.clone();
        url.query_pairs_mut().append_pair("api_key", api_key);

        let http = HttpClient::builder()
            .connect_timeout(connect_timeout)
            .build()
            .unwrap_or_else(|err| {
                warn!(error = %err, "Failed to build HTTP client, using defaults");
                HttpClient::new()
            });

        Ok(Self {
            http,
            url,
            endpoint: base.to_string(),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl GraphqlTransport for HttpTransport {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn post(&self, document: &str, timeout: Duration) -> Result<Value> {
        debug!(endpoint = %self.endpoint, bytes = document.len(), "POST GraphQL document");
        let response = self
            .http
            .post(self.url.clone())
            .timeout(timeout)
            .json(&json!({ "query": document }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Error::Protocol {
                status: Some(status.as_u16()),
                message: format!("HTTP {status}: {}", excerpt(&body)),
            });
        }

        serde_json::from_str(&body).map_err(|err| Error::Protocol {
            status: Some(status.as_u16()),
            message: format!("response is not JSON ({err}): {}", excerpt(&body)),
        })
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_key_is_a_missing_field() {
        let err = HttpTransport::new("https://api.politicsandwar.com/graphql", "  ").unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::MissingField { field: "PNW_API_KEY" })
        ));
    }

    #[test]
    fn key_is_a_query_parameter_but_not_logged() {
        let t = HttpTransport::new("https://api.politicsandwar.com/graphql", "secret").unwrap();
        assert_eq!(t.url.query(), Some("api_key=secret"));
        assert_eq!(t.endpoint(), "https://api.politicsandwar.com/graphql");
        assert!(!format!("{t:?}").contains("secret"));
    }

    #[test]
    fn bad_endpoint_is_rejected() {
        assert!(matches!(
            HttpTransport::new("not a url", "k").unwrap_err(),
            Error::Url(_)
        ));
    }

    #[test]
    fn long_bodies_are_cut() {
        let body = "x".repeat(500);
        assert_eq!(excerpt(&body).chars().count(), BODY_EXCERPT_CHARS + 1);
        assert_eq!(excerpt(" short "), "short");
    }
}
