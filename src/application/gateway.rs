//! The gateway object: one explicit owner for the executor, caches and
//! resolver, with an open/close lifecycle.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::batch::BatchQueryBuilder;
use super::builder::GatewaySettings;
use super::cache::{CacheEntryInfo, EntityCache};
use super::coordinator::ConcurrencyCoordinator;
use super::executor::RequestExecutor;
use super::pagination::{PageOptions, PaginationEngine};
use super::query::{self, AllianceWarsQuery, UnalliedNationsQuery};
use super::resolver::{NameResolver, ResolutionTrace};
use crate::domain::time::floor_to_hour;
use crate::domain::{
    ActivityFilter, AllianceId, Nation, NationLookup, NationSummary, Resolution, Resource,
    TradePrice, TradePriceRow, Treaty, War, WarId,
};
use crate::error::{Error, Result};
use crate::port::{
    Clock, DataGateway, EntityKey, EntityPayload, FetchOptions, GraphqlTransport, RecordStore,
};

/// Cache key of the latest trade price row.
pub const TRADE_PRICES_KEY: &str = "trade_prices";

/// War window used when a caller asks for wars without a cutoff.
const DEFAULT_WAR_WINDOW_DAYS: i64 = 7;

/// Which cached records [`Gateway::clear_cache`] drops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheScope {
    All,
    Key(String),
    Prefix(String),
}

/// Per-alliance outcome of a multi-alliance member fetch.
pub type MemberFetch = (AllianceId, Result<Option<Vec<Nation>>>);

struct Inner {
    executor: Arc<RequestExecutor>,
    pagination: PaginationEngine,
    batch: BatchQueryBuilder,
    coordinator: ConcurrencyCoordinator,
    cache: Arc<EntityCache>,
    resolver: NameResolver,
    clock: Arc<dyn Clock>,
    settings: GatewaySettings,
    closed: AtomicBool,
}

/// Rate-limited, cached access to the remote game API.
///
/// Cloning is cheap and clones share every cache; separately built gateways
/// share nothing.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<Inner>,
}

fn decode<T: DeserializeOwned>(entity: &'static str, payload: Value) -> Result<T> {
    serde_json::from_value(payload).map_err(|err| Error::Decode {
        entity,
        reason: err.to_string(),
    })
}

/// First row of `data.<root>.data`.
fn first_row(data: &Value, root: &str) -> Option<Value> {
    data.get(root)?.get("data")?.as_array()?.first().cloned()
}

/// Members of the single alliance carried by one alias block.
fn members_payload(block: &Value) -> Option<Value> {
    let alliance = block.get("data")?.as_array()?.first()?;
    Some(
        alliance
            .get("nations")
            .filter(|n| !n.is_null())
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new())),
    )
}

/// Per-id copy of a chunk-level failure.
fn replicate(err: &Error) -> Error {
    match err {
        Error::Transport { message, timed_out } => Error::Transport {
            message: message.clone(),
            timed_out: *timed_out,
        },
        Error::Protocol { status, message } => Error::Protocol {
            status: *status,
            message: message.clone(),
        },
        Error::RemoteApi {
            message,
            error_count,
        } => Error::RemoteApi {
            message: message.clone(),
            error_count: *error_count,
        },
        Error::Decode { entity, reason } => Error::Decode {
            entity: *entity,
            reason: reason.clone(),
        },
        Error::Closed => Error::Closed,
        other => Error::Task(other.to_string()),
    }
}

impl Gateway {
    pub(crate) fn assemble(
        settings: GatewaySettings,
        transport: Arc<dyn GraphqlTransport>,
        store: Arc<dyn RecordStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let executor = Arc::new(RequestExecutor::new(transport, settings.executor));
        let cache = Arc::new(EntityCache::new(store, Arc::clone(&clock)));
        let batch = BatchQueryBuilder::new(Arc::clone(&executor), settings.max_ids_per_query);
        let resolver = NameResolver::new(
            Arc::clone(&executor),
            batch.clone(),
            Arc::clone(&cache),
            Arc::clone(&clock),
            settings.resolver.clone(),
        );
        Self {
            inner: Arc::new(Inner {
                pagination: PaginationEngine::new(Arc::clone(&executor)),
                coordinator: ConcurrencyCoordinator::new(
                    settings.max_concurrent,
                    settings.inter_task_delay,
                ),
                executor,
                batch,
                cache,
                resolver,
                clock,
                settings,
                closed: AtomicBool::new(false),
            }),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &GatewaySettings {
        &self.inner.settings
    }

    /// Network requests actually sent so far.
    #[must_use]
    pub fn requests_sent(&self) -> u64 {
        self.inner.executor.requests_sent()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Close the gateway: in-memory state is dropped and every later call
    /// fails with [`Error::Closed`]. Persisted records are kept.
    pub fn close(&self) {
        if !self.inner.closed.swap(true, Ordering::AcqRel) {
            self.inner.executor.clear_dedupe();
            self.inner.cache.clear_shadow();
            info!(requests = self.requests_sent(), "Gateway closed");
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Closed);
        }
        Ok(())
    }

    /// Member nations of one alliance; `None` when the alliance does not exist.
    ///
    /// # Errors
    ///
    /// Fetch failures when no cached record can stand in.
    pub async fn alliance_nations(
        &self,
        id: AllianceId,
        opts: FetchOptions,
    ) -> Result<Option<Vec<Nation>>> {
        self.ensure_open()?;
        let inner = &self.inner;
        let key = EntityKey::AllianceNations(id).cache_key();
        let payload = inner
            .cache
            .get(&key, inner.ttl(opts), opts.force_refresh, || async {
                inner
                    .fetch_members(&[id])
                    .await
                    .pop()
                    .map_or(Ok(None), |(_, result)| result)
            })
            .await?;
        payload.map(|p| decode("nation", p)).transpose()
    }

    /// Member nations of several alliances through aliased batches.
    ///
    /// Fresh records are served from the cache; the rest are fetched in
    /// chunks run by the coordinator. Each alliance gets its own outcome, in
    /// input order with duplicates removed.
    ///
    /// # Errors
    ///
    /// Only [`Error::Closed`]; fetch failures are reported per alliance.
    pub async fn alliances_nations(
        &self,
        ids: &[AllianceId],
        opts: FetchOptions,
    ) -> Result<Vec<MemberFetch>> {
        self.ensure_open()?;
        let inner = &self.inner;
        let ttl = inner.ttl(opts);

        let mut unique: Vec<AllianceId> = Vec::with_capacity(ids.len());
        for id in ids {
            if !unique.contains(id) {
                unique.push(*id);
            }
        }

        let mut answers: BTreeMap<AllianceId, Result<Option<Vec<Nation>>>> = BTreeMap::new();
        let mut missing = Vec::new();
        for id in &unique {
            let key = EntityKey::AllianceNations(*id).cache_key();
            let fresh = if opts.force_refresh {
                None
            } else {
                inner.cache.lookup_fresh(&key, ttl).await
            };
            match fresh {
                Some(record) => {
                    answers.insert(*id, decode("nation", record.payload).map(Some));
                }
                None => missing.push(*id),
            }
        }
        let keys: Vec<String> = missing
            .iter()
            .map(|id| EntityKey::AllianceNations(*id).cache_key())
            .collect();
        let _guards = inner.cache.lock_keys(&keys).await;
        if !opts.force_refresh {
            // Filled by a concurrent caller while we waited for the locks.
            let mut still_missing = Vec::with_capacity(missing.len());
            for id in missing {
                let key = EntityKey::AllianceNations(id).cache_key();
                match inner.cache.lookup_fresh(&key, ttl).await {
                    Some(record) => {
                        answers.insert(id, decode("nation", record.payload).map(Some));
                    }
                    None => still_missing.push(id),
                }
            }
            missing = still_missing;
        }
        debug!(cached = answers.len(), missing = missing.len(), "Member fetch plan");

        for (id, result) in inner.fetch_members(&missing).await {
            let key = EntityKey::AllianceNations(id).cache_key();
            let outcome = match result {
                Ok(Some(payload)) => {
                    let record = inner.cache.put(&key, payload, ttl).await;
                    decode("nation", record.payload).map(Some)
                }
                Ok(None) => Ok(None),
                Err(err) => match inner.stale(&key, opts, &err).await {
                    Some(payload) => decode("nation", payload).map(Some),
                    None => Err(err),
                },
            };
            answers.insert(id, outcome);
        }

        Ok(unique
            .into_iter()
            .map(|id| {
                let outcome = answers.remove(&id).unwrap_or(Ok(None));
                (id, outcome)
            })
            .collect())
    }

    /// Treaties of one alliance; `None` when the alliance does not exist.
    ///
    /// # Errors
    ///
    /// Fetch failures when no cached record can stand in.
    pub async fn alliance_treaties(
        &self,
        id: AllianceId,
        opts: FetchOptions,
    ) -> Result<Option<Vec<Treaty>>> {
        self.ensure_open()?;
        let inner = &self.inner;
        let key = EntityKey::AllianceTreaties(id).cache_key();
        let payload = inner
            .cache
            .get(&key, inner.ttl(opts), opts.force_refresh, || async {
                let data = inner.executor.execute(&query::alliance_treaties(id)).await?;
                Ok(first_row(&data, "alliances").map(|alliance| {
                    alliance
                        .get("treaties")
                        .filter(|t| !t.is_null())
                        .cloned()
                        .unwrap_or_else(|| Value::Array(Vec::new()))
                }))
            })
            .await?;
        payload.map(|p| decode("treaty", p)).transpose()
    }

    /// Wars involving an alliance that fall in the window starting at `cutoff`.
    ///
    /// # Errors
    ///
    /// Pagination failures when no cached record can stand in.
    pub async fn alliance_wars(
        &self,
        id: AllianceId,
        cutoff: DateTime<Utc>,
        opts: FetchOptions,
    ) -> Result<Vec<War>> {
        self.ensure_open()?;
        self.inner.alliance_wars(id, cutoff, opts).await
    }

    /// Wars between any `home` alliance and any `away` alliance, merged by
    /// war id and ordered by it.
    ///
    /// # Errors
    ///
    /// The first per-alliance failure; a partial list is never returned.
    pub async fn wars_between(
        &self,
        home: &[AllianceId],
        away: &[AllianceId],
        cutoff: DateTime<Utc>,
        opts: FetchOptions,
    ) -> Result<Vec<War>> {
        self.ensure_open()?;
        let mut sides: Vec<AllianceId> = home.to_vec();
        sides.sort_unstable();
        sides.dedup();

        let tasks: Vec<_> = sides
            .iter()
            .copied()
            .map(|id| {
                let inner = Arc::clone(&self.inner);
                async move { inner.alliance_wars(id, cutoff, opts).await }
            })
            .collect();

        let mut merged: BTreeMap<WarId, War> = BTreeMap::new();
        for result in self.inner.coordinator.run_bounded(tasks).await {
            for war in result? {
                if war.is_between(home, away) {
                    merged.entry(war.id).or_insert(war);
                }
            }
        }
        info!(
            home = home.len(),
            away = away.len(),
            wars = merged.len(),
            "Collected wars between alliances"
        );
        Ok(merged.into_values().collect())
    }

    /// Latest average trade prices, optionally for some resources only.
    ///
    /// # Errors
    ///
    /// Fetch failures after retries when no cached row can stand in.
    pub async fn trade_prices(
        &self,
        filter: Option<&[Resource]>,
        force_refresh: bool,
    ) -> Result<Vec<TradePrice>> {
        self.ensure_open()?;
        let inner = &self.inner;
        let payload = inner
            .cache
            .get(
                TRADE_PRICES_KEY,
                inner.settings.trade_price_ttl,
                force_refresh,
                || async {
                    let data = inner
                        .executor
                        .execute_with_retry("trade_prices", &query::latest_trade_prices())
                        .await?;
                    Ok(first_row(&data, "tradeprices"))
                },
            )
            .await?;

        let Some(payload) = payload else {
            return Ok(Vec::new());
        };
        let row: TradePriceRow = decode("trade price", payload)?;
        Ok(row
            .into_prices()
            .into_iter()
            .filter(|p| filter.map_or(true, |wanted| wanted.contains(&p.resource)))
            .collect())
    }

    /// One nation by id, nation name or leader name. Not cached.
    ///
    /// # Errors
    ///
    /// Request failures.
    pub async fn nation(&self, lookup: &NationLookup) -> Result<Option<Nation>> {
        self.ensure_open()?;
        let data = self.inner.executor.execute(&query::nation(lookup)).await?;
        first_row(&data, "nations")
            .map(|row| decode("nation", row))
            .transpose()
    }

    /// Unallied, non-vacation nations passing `filter`, most recently active
    /// first.
    ///
    /// # Errors
    ///
    /// Pagination failures when no cached record can stand in.
    pub async fn unallied_nations(
        &self,
        filter: ActivityFilter,
        opts: FetchOptions,
    ) -> Result<Vec<NationSummary>> {
        self.ensure_open()?;
        let summaries = self.inner.unallied_summaries(opts).await?;
        Ok(filter.apply(
            summaries,
            self.inner.clock.now(),
            self.inner.settings.local_offset,
        ))
    }

    /// Resolve free text to a canonical alliance id.
    ///
    /// # Errors
    ///
    /// Only [`Error::Closed`].
    pub async fn resolve_identifier(&self, text: &str) -> Result<Resolution> {
        self.ensure_open()?;
        self.inner.resolver.resolve(text).await
    }

    /// Resolve several texts at once; output order matches input order.
    ///
    /// # Errors
    ///
    /// Only [`Error::Closed`].
    pub async fn resolve_many(&self, texts: &[String]) -> Result<Vec<(String, Resolution)>> {
        self.ensure_open()?;
        self.inner.resolver.resolve_many(texts).await
    }

    /// Resolve `text`, reporting what every strategy did.
    ///
    /// # Errors
    ///
    /// Only [`Error::Closed`].
    pub async fn resolve_traced(&self, text: &str) -> Result<ResolutionTrace> {
        self.ensure_open()?;
        self.inner.resolver.resolve_traced(text).await
    }

    /// Age, size and freshness of every cached record.
    ///
    /// # Errors
    ///
    /// Store listing failures.
    pub async fn cache_info(&self) -> Result<Vec<CacheEntryInfo>> {
        self.ensure_open()?;
        self.inner.cache.info().await
    }

    /// Drop cached records. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Store failures.
    pub async fn clear_cache(&self, scope: CacheScope) -> Result<usize> {
        self.ensure_open()?;
        let cache = &self.inner.cache;
        let removed = match &scope {
            CacheScope::All => cache.clear(None).await?,
            CacheScope::Prefix(prefix) => cache.clear(Some(prefix)).await?,
            CacheScope::Key(key) => usize::from(cache.invalidate(key).await?),
        };
        self.inner.executor.clear_dedupe();
        debug!(?scope, removed, "Cache cleared");
        Ok(removed)
    }
}

impl Inner {
    fn ttl(&self, opts: FetchOptions) -> Duration {
        opts.ttl.unwrap_or(self.settings.cache_ttl)
    }

    fn local(&self) -> FixedOffset {
        self.settings.local_offset
    }

    /// A stale record for `key`, unless the caller forced a refresh.
    async fn stale(&self, key: &str, opts: FetchOptions, err: &Error) -> Option<Value> {
        if opts.force_refresh {
            return None;
        }
        let record = self.cache.peek(key).await?;
        warn!(
            key,
            age_secs = record.age(self.clock.now()).as_secs(),
            error = %err,
            "Fetch failed, serving stale record"
        );
        Some(record.payload)
    }

    /// Fetch member payloads for `ids` in coordinated aliased batches.
    async fn fetch_members(&self, ids: &[AllianceId]) -> Vec<(AllianceId, Result<Option<Value>>)> {
        if ids.is_empty() {
            return Vec::new();
        }
        let raw: Vec<u64> = ids.iter().map(|id| id.get()).collect();
        let requests = self
            .batch
            .build_batches(&raw, &query::alliance_nations_template());

        let tasks: Vec<_> = requests
            .iter()
            .cloned()
            .map(|request| {
                let batch = self.batch.clone();
                async move { batch.run(&request).await }
            })
            .collect();
        let results = self.coordinator.run_bounded(tasks).await;

        let mut out = Vec::with_capacity(ids.len());
        for (request, result) in requests.iter().zip(results) {
            match result {
                Ok(slots) => {
                    for (key, slot) in slots {
                        let Ok(id) = key.parse::<AllianceId>() else {
                            continue;
                        };
                        if slot.is_missing() {
                            debug!(alliance = %id, "No data for alliance in batch");
                        }
                        let payload = slot
                            .into_result()
                            .map(|block| block.as_ref().and_then(members_payload));
                        out.push((id, payload));
                    }
                }
                Err(err) => {
                    warn!(entries = request.len(), error = %err, "Member batch failed");
                    for entry in &request.entries {
                        if let Ok(id) = entry.key.parse::<AllianceId>() {
                            out.push((id, Err(replicate(&err))));
                        }
                    }
                }
            }
        }
        out
    }

    async fn alliance_wars(
        &self,
        id: AllianceId,
        cutoff: DateTime<Utc>,
        opts: FetchOptions,
    ) -> Result<Vec<War>> {
        let window_start = floor_to_hour(cutoff);
        let key = format!(
            "{}@{}",
            EntityKey::AllianceWars(id).cache_key(),
            window_start.timestamp()
        );
        let paged = AllianceWarsQuery {
            alliance: id,
            local: self.local(),
        };
        let page_opts = PageOptions {
            page_size: self.settings.page_size,
            cutoff: Some(window_start),
            max_pages: None,
        };

        let payload = self
            .cache
            .get(&key, self.ttl(opts), opts.force_refresh, || async {
                let items = self.pagination.fetch_all_pages(&paged, page_opts).await?;
                Ok(Some(Value::Array(items)))
            })
            .await?;

        let wars: Vec<War> = match payload {
            Some(payload) => decode("war", payload)?,
            None => Vec::new(),
        };
        let local = self.local();
        Ok(wars
            .into_iter()
            .filter(|war| war.in_window(cutoff, local))
            .collect())
    }

    async fn unallied_summaries(&self, opts: FetchOptions) -> Result<Vec<NationSummary>> {
        let key = EntityKey::UnalliedNations.cache_key();
        let page_opts = PageOptions {
            page_size: self.settings.page_size,
            cutoff: None,
            max_pages: None,
        };
        let payload = self
            .cache
            .get(&key, self.ttl(opts), opts.force_refresh, || async {
                let items = self
                    .pagination
                    .fetch_all_pages(&UnalliedNationsQuery, page_opts)
                    .await?;
                Ok(Some(Value::Array(items)))
            })
            .await?;
        match payload {
            Some(payload) => decode("nation", payload),
            None => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl DataGateway for Gateway {
    async fn fetch_entities(&self, key: EntityKey, opts: FetchOptions) -> Result<EntityPayload> {
        let payload = match key {
            EntityKey::AllianceNations(id) => self
                .alliance_nations(id, opts)
                .await?
                .map_or(EntityPayload::NotFound, EntityPayload::Nations),
            EntityKey::AllianceTreaties(id) => self
                .alliance_treaties(id, opts)
                .await?
                .map_or(EntityPayload::NotFound, EntityPayload::Treaties),
            EntityKey::AllianceWars(id) => {
                let cutoff = opts.cutoff.unwrap_or_else(|| {
                    self.inner.clock.now() - chrono::Duration::days(DEFAULT_WAR_WINDOW_DAYS)
                });
                EntityPayload::Wars(self.alliance_wars(id, cutoff, opts).await?)
            }
            EntityKey::UnalliedNations => {
                self.ensure_open()?;
                EntityPayload::NationSummaries(self.inner.unallied_summaries(opts).await?)
            }
        };
        Ok(payload)
    }

    async fn resolve_identifier(&self, text: &str) -> Result<Resolution> {
        Gateway::resolve_identifier(self, text).await
    }

    async fn fetch_trade_prices(&self, filter: Option<&[Resource]>) -> Result<Vec<TradePrice>> {
        self.trade_prices(filter, false).await
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("executor", &self.inner.executor)
            .field("resolver", &self.inner.resolver)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::store::MemoryRecordStore;
    use crate::application::builder::GatewayBuilder;
    use crate::testkit::config::gateway_settings;
    use crate::testkit::{data_response, ManualClock, ScriptedTransport};
    use serde_json::json;

    fn gateway(transport: Arc<ScriptedTransport>) -> Gateway {
        GatewayBuilder::new(gateway_settings())
            .transport(transport)
            .store(Arc::new(MemoryRecordStore::new()))
            .clock(Arc::new(ManualClock::fixed()))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn closed_gateway_rejects_calls() {
        let transport = Arc::new(ScriptedTransport::sequence(vec![]));
        let gw = gateway(transport.clone());
        gw.close();
        assert!(gw.is_closed());

        let err = gw.resolve_identifier("9445").await.unwrap_err();
        assert!(matches!(err, Error::Closed));
        let err = gw
            .alliance_nations(AllianceId::new(1), FetchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Closed));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn trade_prices_are_cached_and_filtered() {
        let transport = Arc::new(ScriptedTransport::new(|_, _| {
            Ok(data_response(json!({
                "tradeprices": {"data": [{"date": "2024-06-01", "food": 120, "steel": 4100}]}
            })))
        }));
        let gw = gateway(transport.clone());

        let all = gw.trade_prices(None, false).await.unwrap();
        assert_eq!(all.len(), 2);
        let steel = gw
            .trade_prices(Some(&[Resource::Steel]), false)
            .await
            .unwrap();
        assert_eq!(steel.len(), 1);
        assert_eq!(steel[0].resource, Resource::Steel);
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn unknown_alliance_is_not_found() {
        let transport = Arc::new(ScriptedTransport::new(|_, _| {
            Ok(data_response(json!({"entity_404": {"data": []}})))
        }));
        let gw = gateway(transport);

        let payload = gw
            .fetch_entities(
                EntityKey::AllianceNations(AllianceId::new(404)),
                FetchOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(payload, EntityPayload::NotFound);
    }

    #[tokio::test]
    async fn treaties_come_from_first_alliance_row() {
        let transport = Arc::new(ScriptedTransport::new(|_, _| {
            Ok(data_response(json!({
                "alliances": {"data": [{"id": "10", "treaties": [
                    crate::testkit::fixtures::treaty_json(1, "MDP", 10, 20)
                ]}]}
            })))
        }));
        let gw = gateway(transport);

        let treaties = gw
            .alliance_treaties(AllianceId::new(10), FetchOptions::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(treaties.len(), 1);
        assert_eq!(treaties[0].counterpart(AllianceId::new(10)), Some(AllianceId::new(20)));
    }

    #[test]
    fn replicated_errors_keep_their_kind() {
        let err = Error::RemoteApi {
            message: "boom".into(),
            error_count: 1,
        };
        assert_eq!(replicate(&err).kind(), err.kind());
    }
}
