//! Alliance identifier resolution.
//!
//! Free text (an id, a link, a name or an acronym) is resolved by an ordered
//! list of strategies, stopping at the first success:
//!
//! 1. [`Strategy::ParseIdentifier`]: bare digits or `id=<n>` in a link
//! 2. [`Strategy::ExactName`]: targeted name query
//! 3. [`Strategy::ServerSearch`]: case-insensitive server lookup over name variants
//! 4. [`Strategy::TableScan`]: capped scan of the alliance table
//! 5. [`Strategy::LocalSnapshot`]: persisted alliance index and member snapshots
//!
//! Successes are cached under `resolved:<normalized>`. Remote steps retry
//! transient failures and then fall through to the next strategy.

mod normalize;
mod strategy;

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

pub use normalize::{name_matches, normalize, parse_identifier};
pub use strategy::{ResolutionTrace, StepResult, StrategyState};

use super::batch::BatchQueryBuilder;
use super::cache::EntityCache;
use super::executor::RequestExecutor;
use super::pagination::{PageOptions, PaginationEngine};
use super::query::{self, AllianceTableQuery};
use crate::domain::{AllianceRef, Nation, Resolution, ResolvedIdentifier, Strategy};
use crate::error::{Error, Result};
use crate::port::Clock;

/// Cache key prefix for resolved identifiers.
pub const RESOLVED_PREFIX: &str = "resolved:";
/// Cache key of the alliance identity index built by table scans.
pub const ALLIANCE_INDEX_KEY: &str = "alliance_index";
/// Prefix of member snapshots that embed their alliance.
pub const MEMBER_SNAPSHOT_PREFIX: &str = "alliance_nations:";

/// Resolver settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverSettings {
    pub strategies: Vec<Strategy>,
    pub identifier_ttl: Duration,
    pub page_size: u32,
    pub max_scan_pages: u32,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            strategies: Strategy::DEFAULT_ORDER.to_vec(),
            identifier_ttl: Duration::from_secs(86_400),
            page_size: 500,
            max_scan_pages: 40,
        }
    }
}

#[derive(Debug, Clone)]
struct Candidate {
    id: u64,
    name: Option<String>,
    acronym: Option<String>,
}

impl From<AllianceRef> for Candidate {
    fn from(a: AllianceRef) -> Self {
        Self {
            id: a.id.get(),
            name: Some(a.name).filter(|n| !n.is_empty()),
            acronym: a.acronym.filter(|n| !n.is_empty()),
        }
    }
}

enum StepOutcome {
    Found(Candidate),
    Miss,
    Skipped(String),
}

fn candidate_matches(normalized: &str, alliance: &AllianceRef) -> bool {
    name_matches(normalized, Some(&alliance.name))
        || name_matches(normalized, alliance.acronym.as_deref())
}

/// Rows under `data.<root>.data`, skipping any that do not decode.
fn alliance_rows(block: &Value) -> Vec<AllianceRef> {
    block
        .get("data")
        .and_then(Value::as_array)
        .map(|rows| {
            rows.iter()
                .filter_map(|row| serde_json::from_value(row.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Casing variants a case-sensitive name filter might need.
fn name_variants(text: &str, normalized: &str) -> Vec<String> {
    let title = |s: &str| {
        s.split(' ')
            .map(|word| {
                let mut chars = word.chars();
                chars.next().map_or_else(String::new, |first| {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                })
            })
            .collect::<Vec<_>>()
            .join(" ")
    };
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut seen = HashSet::new();
    [
        collapsed.clone(),
        title(&collapsed),
        collapsed.to_uppercase(),
        collapsed.to_lowercase(),
        title(normalized),
        format!("The {}", title(normalized)),
    ]
    .into_iter()
    .filter(|v| !v.is_empty() && seen.insert(v.clone()))
    .collect()
}

/// Cascading identifier resolver.
pub struct NameResolver {
    executor: Arc<RequestExecutor>,
    pagination: PaginationEngine,
    batch: BatchQueryBuilder,
    cache: Arc<EntityCache>,
    clock: Arc<dyn Clock>,
    settings: ResolverSettings,
}

impl NameResolver {
    #[must_use]
    pub fn new(
        executor: Arc<RequestExecutor>,
        batch: BatchQueryBuilder,
        cache: Arc<EntityCache>,
        clock: Arc<dyn Clock>,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            pagination: PaginationEngine::new(Arc::clone(&executor)),
            executor,
            batch,
            cache,
            clock,
            settings,
        }
    }

    #[must_use]
    pub fn strategies(&self) -> &[Strategy] {
        &self.settings.strategies
    }

    /// Resolve `text` to a canonical alliance id.
    ///
    /// # Errors
    ///
    /// None today; strategy failures fall through and exhaustion yields
    /// [`Resolution::NotFound`].
    pub async fn resolve(&self, text: &str) -> Result<Resolution> {
        Ok(self.resolve_traced(text).await?.outcome)
    }

    /// [`resolve`](Self::resolve), recording what each strategy did.
    ///
    /// # Errors
    ///
    /// As [`resolve`](Self::resolve).
    pub async fn resolve_traced(&self, text: &str) -> Result<ResolutionTrace> {
        let normalized = normalize(text);
        let mut trace = ResolutionTrace::new(text, &normalized, &self.settings.strategies);
        if normalized.is_empty() {
            return Ok(trace);
        }

        if let Some(cached) = self.cached(&normalized).await {
            debug!(input = text, id = cached.canonical_id, "Identifier cache hit");
            trace.from_cache = true;
            trace.outcome = Resolution::Found(cached);
            return Ok(trace);
        }

        for strategy in self.settings.strategies.iter().copied() {
            match self.run_step(strategy, text, &normalized).await {
                Ok(StepOutcome::Found(candidate)) => {
                    trace.set(strategy, StrategyState::Tried(StepResult::Success));
                    let resolved = self.remember(&normalized, candidate, strategy).await;
                    info!(
                        input = text,
                        id = resolved.canonical_id,
                        ?strategy,
                        "Resolved identifier"
                    );
                    trace.outcome = Resolution::Found(resolved);
                    return Ok(trace);
                }
                Ok(StepOutcome::Miss) => {
                    trace.set(strategy, StrategyState::Tried(StepResult::Miss));
                }
                Ok(StepOutcome::Skipped(reason)) => {
                    debug!(?strategy, reason = %reason, "Strategy skipped");
                    trace.set(strategy, StrategyState::Skipped(reason));
                }
                Err(err) => {
                    warn!(
                        input = text,
                        ?strategy,
                        error = %err,
                        "Strategy failed, falling through"
                    );
                    trace.set(strategy, StrategyState::Tried(StepResult::Failed(err.to_string())));
                }
            }
        }

        info!(input = text, "Identifier not resolved");
        Ok(trace)
    }

    /// Resolve several inputs, batching exact-name lookups by alias.
    ///
    /// Ids are parsed locally and cached answers reused; the remaining names
    /// share aliased exact-name requests, and only names still unresolved
    /// run the full cascade. Output order matches input order.
    ///
    /// # Errors
    ///
    /// As [`resolve`](Self::resolve).
    pub async fn resolve_many(&self, texts: &[String]) -> Result<Vec<(String, Resolution)>> {
        let uses = |s: Strategy| self.settings.strategies.contains(&s);
        let mut answers: BTreeMap<String, Resolution> = BTreeMap::new();
        let mut pending: Vec<(String, String)> = Vec::new();

        for text in texts {
            let normalized = normalize(text);
            if normalized.is_empty() {
                answers.insert(normalized, Resolution::NotFound);
                continue;
            }
            if answers.contains_key(&normalized) || pending.iter().any(|(n, _)| *n == normalized) {
                continue;
            }
            if let Some(cached) = self.cached(&normalized).await {
                answers.insert(normalized, Resolution::Found(cached));
                continue;
            }
            if uses(Strategy::ParseIdentifier) {
                if let Some(id) = parse_identifier(text) {
                    let candidate = Candidate {
                        id,
                        name: None,
                        acronym: None,
                    };
                    let resolved = self
                        .remember(&normalized, candidate, Strategy::ParseIdentifier)
                        .await;
                    answers.insert(normalized, Resolution::Found(resolved));
                    continue;
                }
            }
            pending.push((normalized, text.trim().to_string()));
        }

        if uses(Strategy::ExactName) && !pending.is_empty() {
            let items: Vec<(String, String)> = pending
                .iter()
                .map(|(normalized, text)| (normalized.clone(), query::alliance_by_name_field(text)))
                .collect();
            for request in self.batch.build_keyed(&items) {
                let slots = match self.batch.run(&request).await {
                    Ok(slots) => slots,
                    Err(err) => {
                        warn!(error = %err, "Batched name lookup failed, resolving individually");
                        continue;
                    }
                };
                for (normalized, slot) in slots {
                    let Some(block) = slot.into_option() else {
                        continue;
                    };
                    if let Some(alliance) = alliance_rows(&block).into_iter().next() {
                        let resolved = self
                            .remember(&normalized, alliance.into(), Strategy::ExactName)
                            .await;
                        answers.insert(normalized, Resolution::Found(resolved));
                    }
                }
            }
        }

        for (normalized, text) in &pending {
            if !answers.contains_key(normalized) {
                let resolution = self.resolve(text).await?;
                answers.insert(normalized.clone(), resolution);
            }
        }

        Ok(texts
            .iter()
            .map(|text| {
                let resolution = answers
                    .get(&normalize(text))
                    .cloned()
                    .unwrap_or(Resolution::NotFound);
                (text.clone(), resolution)
            })
            .collect())
    }

    async fn run_step(
        &self,
        strategy: Strategy,
        text: &str,
        normalized: &str,
    ) -> Result<StepOutcome> {
        match strategy {
            Strategy::ParseIdentifier => Ok(parse_identifier(text).map_or(StepOutcome::Miss, |id| {
                StepOutcome::Found(Candidate {
                    id,
                    name: None,
                    acronym: None,
                })
            })),
            Strategy::ExactName => self.exact_name(text).await,
            Strategy::ServerSearch => self.server_search(text, normalized).await,
            Strategy::TableScan => self.table_scan(normalized).await,
            Strategy::LocalSnapshot => self.local_snapshot(normalized).await,
        }
    }

    async fn exact_name(&self, text: &str) -> Result<StepOutcome> {
        let document = query::alliance_by_name(text.trim());
        let data = self.executor.execute_with_retry("exact_name", &document).await?;
        let rows = data.get("alliances").map(alliance_rows).unwrap_or_default();
        Ok(rows
            .into_iter()
            .next()
            .map_or(StepOutcome::Miss, |a| StepOutcome::Found(a.into())))
    }

    async fn server_search(&self, text: &str, normalized: &str) -> Result<StepOutcome> {
        let variants = name_variants(text, normalized);
        if variants.is_empty() {
            return Ok(StepOutcome::Skipped("no name variants".into()));
        }
        let document = query::alliances_by_names(&variants);
        let data = self.executor.execute_with_retry("server_search", &document).await?;
        let rows = data.get("alliances").map(alliance_rows).unwrap_or_default();
        Ok(rows
            .into_iter()
            .find(|a| candidate_matches(normalized, a))
            .map_or(StepOutcome::Miss, |a| StepOutcome::Found(a.into())))
    }

    async fn table_scan(&self, normalized: &str) -> Result<StepOutcome> {
        let opts = PageOptions {
            page_size: self.settings.page_size,
            cutoff: None,
            max_pages: Some(self.settings.max_scan_pages),
        };
        let retry = self.executor.retry_policy();

        let (found, scanned) = retry
            .run("table_scan", || async {
                let mut scanned: Vec<AllianceRef> = Vec::new();
                let found = self
                    .pagination
                    .scan_pages(&AllianceTableQuery, opts, |rows| {
                        let page: Vec<AllianceRef> = rows
                            .into_iter()
                            .filter_map(|row| serde_json::from_value(row).ok())
                            .collect();
                        let hit = page.iter().find(|a| candidate_matches(normalized, a)).cloned();
                        scanned.extend(page);
                        hit
                    })
                    .await?;
                Ok::<_, Error>((found, scanned))
            })
            .await?;

        self.merge_index(scanned).await;
        Ok(found.map_or(StepOutcome::Miss, |a| StepOutcome::Found(a.into())))
    }

    async fn local_snapshot(&self, normalized: &str) -> Result<StepOutcome> {
        if let Some(index) = self.cache.peek(ALLIANCE_INDEX_KEY).await {
            let alliances: Vec<AllianceRef> =
                serde_json::from_value(index.payload).unwrap_or_default();
            if let Some(hit) = alliances.into_iter().find(|a| candidate_matches(normalized, a)) {
                return Ok(StepOutcome::Found(hit.into()));
            }
        }

        for record in self.cache.records_with_prefix(MEMBER_SNAPSHOT_PREFIX).await? {
            let nations: Vec<Nation> = match serde_json::from_value(record.payload) {
                Ok(nations) => nations,
                Err(err) => {
                    debug!(key = %record.key, error = %err, "Skipping undecodable snapshot");
                    continue;
                }
            };
            let hit = nations
                .iter()
                .filter_map(|n| n.alliance.as_ref())
                .map(AllianceRef::from)
                .find(|a| candidate_matches(normalized, a));
            if let Some(hit) = hit {
                return Ok(StepOutcome::Found(hit.into()));
            }
        }
        Ok(StepOutcome::Miss)
    }

    async fn cached(&self, normalized: &str) -> Option<ResolvedIdentifier> {
        let key = format!("{RESOLVED_PREFIX}{normalized}");
        let record = self.cache.lookup_fresh(&key, self.settings.identifier_ttl).await?;
        match serde_json::from_value(record.payload) {
            Ok(resolved) => Some(resolved),
            Err(err) => {
                warn!(key = %key, error = %err, "Ignoring undecodable resolved identifier");
                None
            }
        }
    }

    async fn remember(
        &self,
        normalized: &str,
        candidate: Candidate,
        strategy: Strategy,
    ) -> ResolvedIdentifier {
        let resolved = ResolvedIdentifier {
            input_normalized: normalized.to_string(),
            canonical_id: candidate.id,
            display_name: candidate.name,
            acronym: candidate.acronym,
            strategy,
            resolved_at: self.clock.now(),
        };
        match serde_json::to_value(&resolved) {
            Ok(payload) => {
                let key = format!("{RESOLVED_PREFIX}{normalized}");
                self.cache
                    .put(&key, payload, self.settings.identifier_ttl)
                    .await;
            }
            Err(err) => warn!(error = %err, "Failed to encode resolved identifier"),
        }
        resolved
    }

    async fn merge_index(&self, scanned: Vec<AllianceRef>) {
        if scanned.is_empty() {
            return;
        }
        let mut by_id: BTreeMap<u64, AllianceRef> = BTreeMap::new();
        if let Some(existing) = self.cache.peek(ALLIANCE_INDEX_KEY).await {
            let previous: Vec<AllianceRef> =
                serde_json::from_value(existing.payload).unwrap_or_default();
            by_id.extend(previous.into_iter().map(|a| (a.id.get(), a)));
        }
        by_id.extend(scanned.into_iter().map(|a| (a.id.get(), a)));

        let merged: Vec<&AllianceRef> = by_id.values().collect();
        match serde_json::to_value(merged) {
            Ok(payload) => {
                self.cache
                    .put(ALLIANCE_INDEX_KEY, payload, self.settings.identifier_ttl)
                    .await;
            }
            Err(err) => warn!(error = %err, "Failed to encode alliance index"),
        }
    }
}

impl std::fmt::Debug for NameResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NameResolver")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
