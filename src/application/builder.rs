//! Explicit construction of a [`Gateway`].

use std::sync::Arc;
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};

use super::executor::ExecutorSettings;
use super::gateway::Gateway;
use super::pagination::MAX_PAGE_SIZE;
use super::resolver::ResolverSettings;
use crate::error::{ConfigError, Result};
use crate::port::{Clock, GraphqlTransport, RecordStore, SystemClock};

/// Everything a gateway needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub executor: ExecutorSettings,
    pub resolver: ResolverSettings,
    pub max_ids_per_query: usize,
    pub max_concurrent: usize,
    pub inter_task_delay: Duration,
    /// Freshness window for entity datasets.
    pub cache_ttl: Duration,
    pub trade_price_ttl: Duration,
    pub page_size: u32,
    /// Offset applied to naive API timestamps.
    pub local_offset: FixedOffset,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            executor: ExecutorSettings::default(),
            resolver: ResolverSettings::default(),
            max_ids_per_query: 5,
            max_concurrent: 3,
            inter_task_delay: Duration::from_millis(1500),
            cache_ttl: Duration::from_secs(3600),
            trade_price_ttl: Duration::from_secs(900),
            page_size: MAX_PAGE_SIZE,
            local_offset: Utc.fix(),
        }
    }
}

/// Builder for [`Gateway`].
///
/// ```no_run
/// use std::sync::Arc;
/// use orbis_gateway::adapter::outbound::graphql::HttpTransport;
/// use orbis_gateway::adapter::outbound::store::FileRecordStore;
/// use orbis_gateway::application::{GatewayBuilder, GatewaySettings};
///
/// # fn main() -> orbis_gateway::error::Result<()> {
/// let transport = HttpTransport::new("https://api.politicsandwar.com/graphql", "key")?;
/// let gateway = GatewayBuilder::new(GatewaySettings::default())
///     .transport(Arc::new(transport))
///     .store(Arc::new(FileRecordStore::new("cache")))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct GatewayBuilder {
    settings: GatewaySettings,
    transport: Option<Arc<dyn GraphqlTransport>>,
    store: Option<Arc<dyn RecordStore>>,
    clock: Option<Arc<dyn Clock>>,
}

impl GatewayBuilder {
    #[must_use]
    pub fn new(settings: GatewaySettings) -> Self {
        Self {
            settings,
            transport: None,
            store: None,
            clock: None,
        }
    }

    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn GraphqlTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    #[must_use]
    pub fn store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Defaults to the system clock.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// # Errors
    ///
    /// [`ConfigError::MissingField`] when the transport or the store is unset.
    pub fn build(self) -> Result<Gateway> {
        let transport = self
            .transport
            .ok_or(ConfigError::MissingField { field: "transport" })?;
        let store = self
            .store
            .ok_or(ConfigError::MissingField { field: "store" })?;
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        Ok(Gateway::assemble(self.settings, transport, store, clock))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::store::MemoryRecordStore;
    use crate::error::Error;
    use crate::testkit::ScriptedTransport;

    #[test]
    fn transport_is_required() {
        let err = GatewayBuilder::new(GatewaySettings::default())
            .store(Arc::new(MemoryRecordStore::new()))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::MissingField { field: "transport" })
        ));
    }

    #[test]
    fn gateways_are_independent() {
        let build = || {
            GatewayBuilder::new(GatewaySettings::default())
                .transport(Arc::new(ScriptedTransport::sequence(vec![])))
                .store(Arc::new(MemoryRecordStore::new()))
                .build()
                .unwrap()
        };
        let a = build();
        let b = build();
        a.close();
        assert!(a.is_closed());
        assert!(!b.is_closed());
    }
}
