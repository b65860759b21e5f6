//! Inbound port: the only calls feature modules make into the gateway.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    AllianceId, Nation, NationSummary, Resolution, Resource, TradePrice, Treaty, War,
};
use crate::error::Result;

/// A logical cached dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityKey {
    /// Every member nation of an alliance.
    AllianceNations(AllianceId),
    /// Treaties an alliance is party to.
    AllianceTreaties(AllianceId),
    /// Wars involving an alliance's members.
    AllianceWars(AllianceId),
    /// Every nation outside an alliance.
    UnalliedNations,
}

impl EntityKey {
    /// Cache key prefix shared by every key of this kind.
    #[must_use]
    pub const fn prefix(&self) -> &'static str {
        match self {
            Self::AllianceNations(_) => "alliance_nations",
            Self::AllianceTreaties(_) => "alliance_treaties",
            Self::AllianceWars(_) => "alliance_wars",
            Self::UnalliedNations => "unallied_nations",
        }
    }

    /// Cache key for this dataset.
    #[must_use]
    pub fn cache_key(&self) -> String {
        match self {
            Self::AllianceNations(id) | Self::AllianceTreaties(id) | Self::AllianceWars(id) => {
                format!("{}:{id}", self.prefix())
            }
            Self::UnalliedNations => self.prefix().to_string(),
        }
    }
}

/// Per-call fetch options.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOptions {
    /// Skip the cache read; the fresh result is still written back.
    pub force_refresh: bool,
    /// Override the configured TTL for this call.
    pub ttl: Option<Duration>,
    /// Only events at or after this instant are of interest.
    pub cutoff: Option<DateTime<Utc>>,
}

impl FetchOptions {
    #[must_use]
    pub fn refreshed() -> Self {
        Self {
            force_refresh: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn since(cutoff: DateTime<Utc>) -> Self {
        Self {
            cutoff: Some(cutoff),
            ..Self::default()
        }
    }
}

/// Typed payload returned by [`DataGateway::fetch_entities`].
#[derive(Debug, Clone, PartialEq)]
pub enum EntityPayload {
    Nations(Vec<Nation>),
    NationSummaries(Vec<NationSummary>),
    Treaties(Vec<Treaty>),
    Wars(Vec<War>),
    /// The remote API has no such entity.
    NotFound,
}

impl EntityPayload {
    /// Number of records carried.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Nations(v) => v.len(),
            Self::NationSummaries(v) => v.len(),
            Self::Treaties(v) => v.len(),
            Self::Wars(v) => v.len(),
            Self::NotFound => 0,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Data access for alliance dashboards, comparisons, recruitment and war
/// analysis.
///
/// # Errors
///
/// Every failure is one of the crate's error kinds; "no such entity" is
/// never an error.
#[async_trait]
pub trait DataGateway: Send + Sync {
    /// Fetch a cached dataset, refreshing it when stale or forced.
    async fn fetch_entities(&self, key: EntityKey, opts: FetchOptions) -> Result<EntityPayload>;

    /// Resolve free text (id, link, name, acronym) to a canonical id.
    async fn resolve_identifier(&self, text: &str) -> Result<Resolution>;

    /// Latest average trade prices, optionally restricted to some resources.
    async fn fetch_trade_prices(&self, filter: Option<&[Resource]>) -> Result<Vec<TradePrice>>;
}
