//! Handlers for every CLI subcommand.
//!
//! Each handler resolves its inputs, calls one gateway operation and prints
//! either a table or a single JSON document.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tabled::Tabled;
use tracing::debug;

use super::command::{
    AllianceArgs, CacheClearArgs, CacheCommand, Commands, NationArgs, PricesArgs, RecruitsArgs,
    ResolveArgs, TreatiesArgs, WarsArgs,
};
use super::output;
use crate::application::resolver::{StepResult, StrategyState};
use crate::application::{CacheScope, Gateway};
use crate::domain::time::{cutoff_before, parse_lookback};
use crate::domain::{
    ActivityFilter, AllianceId, Nation, NationId, NationLookup, NationSummary, Resolution, War,
    WarId,
};
use crate::error::{ConfigError, Result};
use crate::port::FetchOptions;

/// How a command ended when it did not fail outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every input was answered.
    Complete,
    /// Some input was unresolved, missing remotely, or failed on its own.
    Partial,
}

impl Outcome {
    fn from_gaps(gaps: usize) -> Self {
        if gaps == 0 {
            Self::Complete
        } else {
            Self::Partial
        }
    }
}

fn options(refresh: bool) -> FetchOptions {
    if refresh {
        FetchOptions::refreshed()
    } else {
        FetchOptions::default()
    }
}

/// The window named by `raw` and the cutoff it puts before `now`.
fn lookback_cutoff(
    field: &'static str,
    raw: &str,
    now: DateTime<Utc>,
) -> Result<(chrono::Duration, DateTime<Utc>)> {
    let window = parse_lookback(raw).ok_or_else(|| ConfigError::InvalidValue {
        field,
        reason: format!("expected a window like 6h, 3d, 2w or 2m, got {raw:?}"),
    })?;
    let cutoff = cutoff_before(now, window).ok_or_else(|| ConfigError::InvalidValue {
        field,
        reason: format!("window {raw:?} reaches before the earliest supported date"),
    })?;
    Ok((window, cutoff))
}

fn resolution_json(input: &str, resolution: &Resolution) -> Value {
    match resolution.found() {
        Some(found) => json!({
            "input": input,
            "found": true,
            "id": found.canonical_id,
            "name": found.display_name,
            "acronym": found.acronym,
            "strategy": found.strategy,
        }),
        None => json!({ "input": input, "found": false }),
    }
}

/// Resolve alliance inputs, warning about the ones that stay unresolved.
async fn resolve_alliances(
    gateway: &Gateway,
    inputs: &[String],
) -> Result<(Vec<AllianceId>, Vec<String>)> {
    let mut ids = Vec::with_capacity(inputs.len());
    let mut unresolved = Vec::new();
    for (input, resolution) in gateway.resolve_many(inputs).await? {
        match resolution.canonical_id() {
            Some(id) => ids.push(AllianceId::new(id)),
            None => {
                output::warning(&format!("Could not resolve alliance {input:?}"));
                unresolved.push(input);
            }
        }
    }
    debug!(resolved = ids.len(), unresolved = unresolved.len(), "Resolved CLI alliances");
    Ok((ids, unresolved))
}

/// Run one parsed subcommand.
///
/// # Errors
///
/// Invalid arguments or a failed gateway call that has no per-input outcome.
pub async fn dispatch(gateway: &Gateway, command: Commands) -> Result<Outcome> {
    match command {
        Commands::Resolve(args) => resolve(gateway, args).await,
        Commands::Nations(args) => nations(gateway, args).await,
        Commands::Treaties(args) => treaties(gateway, args).await,
        Commands::Wars(args) => wars(gateway, args).await,
        Commands::Prices(args) => prices(gateway, args).await,
        Commands::Nation(args) => nation(gateway, args).await,
        Commands::Recruits(args) => recruits(gateway, args).await,
        Commands::Cache(CacheCommand::Info) => cache_info(gateway).await,
        Commands::Cache(CacheCommand::Clear(args)) => cache_clear(gateway, args).await,
    }
}

#[derive(Tabled)]
struct ResolvedRow {
    #[tabled(rename = "Input")]
    input: String,
    #[tabled(rename = "Id")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Acronym")]
    acronym: String,
    #[tabled(rename = "Via")]
    strategy: String,
}

#[derive(Tabled)]
struct StepRow {
    #[tabled(rename = "Strategy")]
    strategy: String,
    #[tabled(rename = "State")]
    state: String,
}

fn describe_state(state: &StrategyState) -> String {
    match state {
        StrategyState::NotTried => output::muted("not tried"),
        StrategyState::Skipped(reason) => output::muted(format!("skipped ({reason})")),
        StrategyState::Tried(StepResult::Success) => output::flag(true, "success", ""),
        StrategyState::Tried(StepResult::Miss) => "miss".to_string(),
        StrategyState::Tried(StepResult::Failed(reason)) => {
            output::flag(false, "", &format!("failed: {reason}"))
        }
    }
}

async fn resolve(gateway: &Gateway, args: ResolveArgs) -> Result<Outcome> {
    if args.trace && args.inputs.len() == 1 {
        let trace = gateway.resolve_traced(&args.inputs[0]).await?;
        let found = trace.outcome.is_found();
        if output::is_json() {
            output::json_output(json!({
                "resolution": resolution_json(&trace.input, &trace.outcome),
                "trace": trace,
            }));
        } else {
            output::field("Input", &trace.input);
            output::field("Normalized", &trace.normalized);
            output::field("From cache", trace.from_cache);
            match trace.outcome.found() {
                Some(r) => output::field(
                    "Resolved",
                    format!(
                        "{} {}",
                        output::highlight(r.canonical_id),
                        r.display_name.as_deref().unwrap_or("")
                    ),
                ),
                None => output::field("Resolved", output::flag(false, "", "not found")),
            }
            output::section("Strategies");
            let rows = trace
                .steps
                .iter()
                .map(|(strategy, state)| StepRow {
                    strategy: format!("{strategy:?}"),
                    state: describe_state(state),
                })
                .collect();
            output::table(rows, "No strategies configured");
        }
        return Ok(Outcome::from_gaps(usize::from(!found)));
    }
    if args.trace {
        output::warning("--trace applies to a single input; resolving without trace");
    }

    let results = gateway.resolve_many(&args.inputs).await?;
    let gaps = results.iter().filter(|(_, r)| !r.is_found()).count();
    if output::is_json() {
        let items: Vec<Value> = results
            .iter()
            .map(|(input, r)| resolution_json(input, r))
            .collect();
        output::json_output(Value::Array(items));
    } else {
        let rows = results
            .into_iter()
            .map(|(input, resolution)| match resolution {
                Resolution::Found(r) => ResolvedRow {
                    input,
                    id: output::highlight(r.canonical_id),
                    name: r.display_name.unwrap_or_default(),
                    acronym: r.acronym.unwrap_or_default(),
                    strategy: format!("{:?}", r.strategy),
                },
                Resolution::NotFound => ResolvedRow {
                    input,
                    id: output::flag(false, "", "not found"),
                    name: String::new(),
                    acronym: String::new(),
                    strategy: String::new(),
                },
            })
            .collect();
        output::table(rows, "Nothing to resolve");
    }
    Ok(Outcome::from_gaps(gaps))
}

#[derive(Tabled)]
struct NationRow {
    #[tabled(rename = "Id")]
    id: NationId,
    #[tabled(rename = "Nation")]
    nation: String,
    #[tabled(rename = "Leader")]
    leader: String,
    #[tabled(rename = "Cities")]
    cities: u32,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Last active")]
    last_active: String,
}

impl From<&Nation> for NationRow {
    fn from(n: &Nation) -> Self {
        Self {
            id: n.id,
            nation: n.nation_name.clone(),
            leader: n.leader_name.clone(),
            cities: n.num_cities,
            score: format!("{:.2}", n.score),
            last_active: n.last_active.clone().unwrap_or_default(),
        }
    }
}

impl From<&NationSummary> for NationRow {
    fn from(n: &NationSummary) -> Self {
        Self {
            id: n.id,
            nation: n.nation_name.clone(),
            leader: n.leader_name.clone(),
            cities: n.num_cities,
            score: format!("{:.2}", n.score),
            last_active: n.last_active.clone().unwrap_or_default(),
        }
    }
}

async fn nations(gateway: &Gateway, args: AllianceArgs) -> Result<Outcome> {
    let (ids, unresolved) = resolve_alliances(gateway, &args.alliances).await?;
    let spinner = output::spinner(&format!("Fetching members of {} alliances", ids.len()));
    let results = match gateway.alliances_nations(&ids, options(args.refresh)).await {
        Ok(results) => results,
        Err(err) => {
            output::spinner_fail(&spinner);
            return Err(err);
        }
    };
    output::spinner_success(&spinner, "Fetched members");

    let mut gaps = unresolved.len();
    let mut documents = Vec::with_capacity(results.len());
    for (id, result) in results {
        match result {
            Ok(Some(members)) => {
                if output::is_json() {
                    documents.push(json!({
                        "alliance_id": id,
                        "status": "ok",
                        "nations": members,
                    }));
                } else {
                    output::section(&format!("Alliance {id} ({} members)", members.len()));
                    output::table(members.iter().map(NationRow::from).collect(), "No members");
                }
            }
            Ok(None) => {
                gaps += 1;
                output::warning(&format!("Alliance {id} does not exist"));
                documents.push(json!({ "alliance_id": id, "status": "not_found" }));
            }
            Err(err) => {
                gaps += 1;
                output::error(&format!("Alliance {id}: {err}"));
                documents.push(
                    json!({ "alliance_id": id, "status": "error", "error": err.to_string() }),
                );
            }
        }
    }
    if output::is_json() {
        output::json_output(json!({ "alliances": documents, "unresolved": unresolved }));
    }
    Ok(Outcome::from_gaps(gaps))
}

#[derive(Tabled)]
struct TreatyRow {
    #[tabled(rename = "Type")]
    treaty_type: String,
    #[tabled(rename = "With")]
    with: String,
    #[tabled(rename = "Since")]
    date: String,
    #[tabled(rename = "Turns left")]
    turns_left: i32,
    #[tabled(rename = "Approved")]
    approved: String,
}

async fn treaties(gateway: &Gateway, args: TreatiesArgs) -> Result<Outcome> {
    let (ids, _) = resolve_alliances(gateway, std::slice::from_ref(&args.alliance)).await?;
    let Some(id) = ids.first().copied() else {
        return Ok(Outcome::Partial);
    };
    let Some(treaties) = gateway.alliance_treaties(id, options(args.refresh)).await? else {
        output::warning(&format!("Alliance {id} does not exist"));
        return Ok(Outcome::Partial);
    };

    if output::is_json() {
        output::json_output(json!({ "alliance_id": id, "treaties": treaties }));
        return Ok(Outcome::Complete);
    }
    output::section(&format!("Treaties of alliance {id}"));
    let rows = treaties
        .iter()
        .map(|t| {
            let other = if t.alliance1_id == id {
                t.alliance2.as_ref()
            } else {
                t.alliance1.as_ref()
            };
            let with = match (t.counterpart(id), other) {
                (Some(cid), Some(r)) => format!("{} ({cid})", r.name),
                (Some(cid), None) => cid.to_string(),
                (None, _) => String::new(),
            };
            TreatyRow {
                treaty_type: t.treaty_type.clone(),
                with,
                date: t.date.clone().unwrap_or_default(),
                turns_left: t.turns_left,
                approved: t
                    .approved
                    .map_or_else(String::new, |a| output::flag(a, "yes", "pending")),
            }
        })
        .collect();
    output::table(rows, "No treaties");
    Ok(Outcome::Complete)
}

#[derive(Tabled)]
struct WarRow {
    #[tabled(rename = "War")]
    id: WarId,
    #[tabled(rename = "Started")]
    date: String,
    #[tabled(rename = "Attacker")]
    attacker: String,
    #[tabled(rename = "Defender")]
    defender: String,
    #[tabled(rename = "Type")]
    war_type: String,
    #[tabled(rename = "Status")]
    status: String,
}

fn side(nation: NationId, alliance: Option<AllianceId>) -> String {
    match alliance {
        Some(a) => format!("{nation} ({a})"),
        None => nation.to_string(),
    }
}

async fn wars(gateway: &Gateway, args: WarsArgs) -> Result<Outcome> {
    let (_, cutoff) = lookback_cutoff("since", &args.since, Utc::now())?;
    let opts = options(args.refresh);

    let (home, mut unresolved) = resolve_alliances(gateway, &args.alliances).await?;
    let wars: Vec<War> = if args.against.is_empty() {
        let mut merged: BTreeMap<WarId, War> = BTreeMap::new();
        for id in &home {
            for war in gateway.alliance_wars(*id, cutoff, opts).await? {
                merged.entry(war.id).or_insert(war);
            }
        }
        merged.into_values().collect()
    } else {
        let (away, missing) = resolve_alliances(gateway, &args.against).await?;
        unresolved.extend(missing);
        gateway.wars_between(&home, &away, cutoff, opts).await?
    };

    if output::is_json() {
        output::json_output(json!({
            "cutoff": cutoff,
            "wars": wars,
            "unresolved": unresolved,
        }));
    } else {
        output::section(&format!("{} wars since {}", wars.len(), cutoff.format("%Y-%m-%d %H:%M")));
        let rows = wars
            .iter()
            .map(|w| WarRow {
                id: w.id,
                date: w.date.clone().unwrap_or_default(),
                attacker: side(w.att_id, w.att_alliance_id),
                defender: side(w.def_id, w.def_alliance_id),
                war_type: w.war_type.clone().unwrap_or_default(),
                status: output::flag(w.is_active(), "active", "ended"),
            })
            .collect();
        output::table(rows, "No wars in window");
    }
    Ok(Outcome::from_gaps(unresolved.len()))
}

#[derive(Tabled)]
struct PriceRow {
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Average price")]
    price: String,
}

async fn prices(gateway: &Gateway, args: PricesArgs) -> Result<Outcome> {
    let filter = (!args.resources.is_empty()).then_some(args.resources.as_slice());
    let prices = gateway.trade_prices(filter, args.refresh).await?;

    if output::is_json() {
        output::json_output(json!({ "prices": prices }));
    } else {
        if let Some(date) = prices.first().and_then(|p| p.date.as_deref()) {
            output::field("As of", date);
        }
        let rows = prices
            .iter()
            .map(|p| PriceRow {
                resource: p.resource.to_string(),
                price: output::highlight(p.average_price),
            })
            .collect();
        output::table(rows, "No trade prices available");
    }
    Ok(Outcome::from_gaps(usize::from(prices.is_empty())))
}

async fn nation(gateway: &Gateway, args: NationArgs) -> Result<Outcome> {
    let lookup = match (args.id, args.name, args.leader) {
        (Some(id), _, _) => NationLookup::Id(NationId::new(id)),
        (None, Some(name), _) => NationLookup::Name(name),
        (None, None, Some(leader)) => NationLookup::Leader(leader),
        (None, None, None) => {
            return Err(ConfigError::MissingField {
                field: "id, name or leader",
            }
            .into())
        }
    };

    let Some(nation) = gateway.nation(&lookup).await? else {
        if output::is_json() {
            output::json_output(Value::Null);
        }
        output::warning("No such nation");
        return Ok(Outcome::Partial);
    };

    if output::is_json() {
        output::json_output(json!(nation));
        return Ok(Outcome::Complete);
    }
    output::field("Nation", format!("{} ({})", nation.nation_name, output::highlight(nation.id)));
    output::field("Leader", &nation.leader_name);
    match (&nation.alliance, nation.alliance_id) {
        (Some(a), _) => output::field("Alliance", format!("{} ({})", a.name, a.id)),
        (None, Some(id)) => output::field("Alliance", id),
        (None, None) => output::field("Alliance", output::muted("none")),
    }
    output::field("Cities", nation.num_cities);
    output::field("Score", format!("{:.2}", nation.score));
    if let Some(active) = &nation.last_active {
        output::field("Last active", active);
    }
    output::field(
        "Military",
        format!(
            "{} soldiers, {} tanks, {} aircraft, {} ships",
            nation.soldiers, nation.tanks, nation.aircraft, nation.ships
        ),
    );
    if nation.in_vacation_mode() {
        output::field("Vacation", format!("{} turns", nation.vacation_mode_turns));
    }
    Ok(Outcome::Complete)
}

async fn recruits(gateway: &Gateway, args: RecruitsArgs) -> Result<Outcome> {
    let (inactive_after, _) =
        lookback_cutoff("inactive_after", &args.inactive_after, Utc::now())?;
    let filter = ActivityFilter::new(inactive_after, args.missing_activity.into());

    let spinner = output::spinner("Scanning unallied nations");
    let mut found = match gateway.unallied_nations(filter, options(args.refresh)).await {
        Ok(found) => found,
        Err(err) => {
            output::spinner_fail(&spinner);
            return Err(err);
        }
    };
    output::spinner_success(&spinner, &format!("{} candidates", found.len()));
    let total = found.len();
    found.truncate(args.limit);

    if output::is_json() {
        output::json_output(json!({ "total": total, "nations": found }));
    } else {
        output::table(found.iter().map(NationRow::from).collect(), "No active unallied nations");
        if total > found.len() {
            output::note(&format!("{} more not shown", total - found.len()));
        }
    }
    Ok(Outcome::Complete)
}

#[derive(Tabled)]
struct CacheRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Updated")]
    updated: String,
    #[tabled(rename = "Age")]
    age: String,
    #[tabled(rename = "Records")]
    records: usize,
    #[tabled(rename = "State")]
    state: String,
}

fn human_age(secs: u64) -> String {
    match secs {
        s if s < 60 => format!("{s}s"),
        s if s < 3600 => format!("{}m", s / 60),
        s if s < 86_400 => format!("{}h {}m", s / 3600, (s % 3600) / 60),
        s => format!("{}d {}h", s / 86_400, (s % 86_400) / 3600),
    }
}

async fn cache_info(gateway: &Gateway) -> Result<Outcome> {
    let entries = gateway.cache_info().await?;
    if output::is_json() {
        output::json_output(json!({ "entries": entries }));
        return Ok(Outcome::Complete);
    }
    let fresh = entries.iter().filter(|e| e.fresh).count();
    output::field("Records", entries.len());
    output::field("Fresh", fresh);
    let rows = entries
        .into_iter()
        .map(|e| CacheRow {
            key: e.key,
            updated: e.last_updated.format("%Y-%m-%d %H:%M:%S").to_string(),
            age: human_age(e.age.as_secs()),
            records: e.record_count,
            state: output::flag(e.fresh, "fresh", "stale"),
        })
        .collect();
    output::table(rows, "Cache is empty");
    Ok(Outcome::Complete)
}

async fn cache_clear(gateway: &Gateway, args: CacheClearArgs) -> Result<Outcome> {
    let scope = match (args.key, args.prefix) {
        (Some(key), _) => CacheScope::Key(key),
        (None, Some(prefix)) => CacheScope::Prefix(prefix),
        (None, None) => CacheScope::All,
    };
    let removed = gateway.clear_cache(scope).await?;
    if output::is_json() {
        output::json_output(json!({ "removed": removed }));
    } else {
        output::success(&format!("Removed {removed} cached records"));
    }
    Ok(Outcome::Complete)
}
