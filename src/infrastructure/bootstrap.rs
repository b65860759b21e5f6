//! Composition root: wires the HTTP transport and the file store into a
//! gateway from configuration.

use std::sync::Arc;

use tracing::info;

use crate::adapter::outbound::graphql::HttpTransport;
use crate::adapter::outbound::store::FileRecordStore;
use crate::application::{Gateway, GatewayBuilder};
use crate::error::Result;
use crate::infrastructure::config::settings::Config;

/// Build the HTTP transport described by `config`.
///
/// # Errors
///
/// A missing `PNW_API_KEY` or an invalid endpoint.
pub fn build_transport(config: &Config) -> Result<HttpTransport> {
    HttpTransport::with_timeouts(
        &config.api.endpoint,
        config.api_key()?,
        config.api.connect_timeout(),
    )
}

impl Gateway {
    /// Open a gateway talking HTTP and persisting records under the
    /// configured cache directory.
    ///
    /// # Errors
    ///
    /// A missing `PNW_API_KEY`, an invalid endpoint or timezone.
    pub fn open(config: &Config) -> Result<Self> {
        let transport = build_transport(config)?;
        let directory = config.cache.resolved_directory();
        info!(
            endpoint = transport.endpoint(),
            cache = %directory.display(),
            "Opening gateway"
        );
        GatewayBuilder::new(config.gateway_settings()?)
            .transport(Arc::new(transport))
            .store(Arc::new(FileRecordStore::new(directory)))
            .build()
    }
}
