mod support;

use std::collections::BTreeSet;
use std::time::Duration;

use orbis_gateway::application::resolver::{StepResult, StrategyState};
use orbis_gateway::domain::{
    ActivityFilter, AllianceId, MissingActivity, Nation, NationId, Resolution, Strategy,
};
use orbis_gateway::error::Error;
use orbis_gateway::port::{Clock, DataGateway, EntityKey, EntityPayload, FetchOptions};
use orbis_gateway::testkit::fixtures::{nation_active_json, treaty_json, war_json};
use orbis_gateway::testkit::config::gateway_settings;
use orbis_gateway::testkit::{data_response, page_response, transport_failure, ScriptedTransport};
use serde_json::json;
use support::{aliased_ids, members_response, Harness};

fn ids(raw: &[u64]) -> Vec<AllianceId> {
    raw.iter().copied().map(AllianceId::new).collect()
}

fn nation_ids(nations: &[Nation]) -> BTreeSet<NationId> {
    nations.iter().map(|n| n.id).collect()
}

fn cybertron_lookup(document: &str) -> serde_json::Value {
    if document.contains(r#"name: ["Cybertr0n"]"#) {
        data_response(json!({
            "alliances": {"data": [{"id": "9445", "name": "Cybertr0n", "acronym": "CYB"}]}
        }))
    } else {
        data_response(json!({ "alliances": {"data": []} }))
    }
}

#[tokio::test]
async fn cached_members_stay_fresh_for_the_ttl() {
    let h = Harness::new(|doc, _| Ok(members_response(doc, &[])));
    let opts = FetchOptions {
        ttl: Some(Duration::from_secs(60)),
        ..FetchOptions::default()
    };
    let id = AllianceId::new(9445);

    let first = h.gateway.alliance_nations(id, opts).await.unwrap().unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(h.requests(), 1);

    h.clock.advance_secs(30);
    h.gateway.alliance_nations(id, opts).await.unwrap();
    assert_eq!(h.requests(), 1);

    h.clock.advance_secs(31);
    h.gateway.alliance_nations(id, opts).await.unwrap();
    assert_eq!(h.requests(), 2);
}

#[tokio::test]
async fn force_refresh_bypasses_a_fresh_record() {
    let h = Harness::new(|doc, _| Ok(members_response(doc, &[])));
    let id = AllianceId::new(7);

    h.gateway.alliance_nations(id, FetchOptions::default()).await.unwrap();
    h.gateway.alliance_nations(id, FetchOptions::refreshed()).await.unwrap();
    assert_eq!(h.requests(), 2);

    h.gateway.alliance_nations(id, FetchOptions::default()).await.unwrap();
    assert_eq!(h.requests(), 2);
}

#[tokio::test]
async fn batched_members_equal_sequential_fetches() {
    let batched = Harness::new(|doc, _| Ok(members_response(doc, &[])));
    let results = batched
        .gateway
        .alliances_nations(&ids(&[1, 2, 3]), FetchOptions::default())
        .await
        .unwrap();
    assert_eq!(batched.requests(), 1);

    let sequential = Harness::new(|doc, _| Ok(members_response(doc, &[])));
    for (id, result) in results {
        let from_batch = result.unwrap().unwrap();
        let alone = sequential
            .gateway
            .alliance_nations(id, FetchOptions::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(nation_ids(&from_batch), nation_ids(&alone));
    }
    assert_eq!(sequential.requests(), 3);
}

#[tokio::test]
async fn missing_alias_is_reported_without_failing_the_batch() {
    let h = Harness::new(|doc, _| Ok(members_response(doc, &[2])));
    let results = h
        .gateway
        .alliances_nations(&ids(&[1, 2, 3]), FetchOptions::default())
        .await
        .unwrap();

    let order: Vec<u64> = results.iter().map(|(id, _)| id.get()).collect();
    assert_eq!(order, vec![1, 2, 3]);
    assert_eq!(results[0].1.as_ref().unwrap().as_ref().unwrap().len(), 2);
    assert!(results[1].1.as_ref().unwrap().is_none());
    assert_eq!(results[2].1.as_ref().unwrap().as_ref().unwrap().len(), 2);
}

#[tokio::test]
async fn ids_beyond_the_batch_size_are_chunked() {
    let h = Harness::new(|doc, _| Ok(members_response(doc, &[])));
    let wanted: Vec<u64> = (1..=12).collect();
    let results = h
        .gateway
        .alliances_nations(&ids(&wanted), FetchOptions::default())
        .await
        .unwrap();

    assert_eq!(results.len(), 12);
    assert!(results.iter().all(|(_, r)| matches!(r, Ok(Some(_)))));
    assert_eq!(h.requests(), 3);
}

/// Composites and alliance 2 on its own fail; alliance 1 alone succeeds.
fn second_alliance_unreachable(doc: &str) -> orbis_gateway::Result<serde_json::Value> {
    if aliased_ids(doc).contains(&2) {
        return Err(transport_failure());
    }
    Ok(members_response(doc, &[]))
}

#[tokio::test]
async fn failed_follow_up_request_is_an_error_not_a_missing_alliance() {
    let h = Harness::new(|doc, _| second_alliance_unreachable(doc));
    let results = h
        .gateway
        .alliances_nations(&ids(&[1, 2]), FetchOptions::default())
        .await
        .unwrap();

    assert_eq!(h.requests(), 3);
    assert_eq!(results[0].1.as_ref().unwrap().as_ref().unwrap().len(), 2);
    assert!(matches!(results[1].1, Err(Error::Transport { .. })));
}

#[tokio::test]
async fn failed_follow_up_request_serves_the_stale_record() {
    let h = Harness::new(|doc, n| {
        if n == 0 {
            return Ok(members_response(doc, &[]));
        }
        second_alliance_unreachable(doc)
    });
    let wanted = ids(&[1, 2]);

    h.gateway
        .alliances_nations(&wanted, FetchOptions::default())
        .await
        .unwrap();
    h.clock.advance_secs(7200);

    let results = h
        .gateway
        .alliances_nations(&wanted, FetchOptions::default())
        .await
        .unwrap();
    assert_eq!(h.requests(), 4);
    for (_, result) in results {
        assert_eq!(result.unwrap().unwrap().len(), 2);
    }
}

#[tokio::test(start_paused = true)]
async fn concurrent_single_and_batched_member_fetches_share_one_request() {
    let transport = ScriptedTransport::new(|doc, _| Ok(members_response(doc, &[])))
        .with_latency(Duration::from_millis(200));
    let h = Harness::with_transport(gateway_settings(), transport);
    let id = AllianceId::new(9445);
    let wanted = [id];

    let (single, batched) = tokio::join!(
        h.gateway.alliance_nations(id, FetchOptions::default()),
        h.gateway.alliances_nations(&wanted, FetchOptions::default()),
    );

    assert_eq!(single.unwrap().unwrap().len(), 2);
    let batched = batched.unwrap();
    assert_eq!(batched[0].1.as_ref().unwrap().as_ref().unwrap().len(), 2);
    assert_eq!(h.requests(), 1);
}

#[tokio::test]
async fn failed_chunk_is_reported_per_alliance() {
    let h = Harness::new(|_, _| Err(transport_failure()));
    let results = h
        .gateway
        .alliances_nations(&ids(&[1, 2]), FetchOptions::default())
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    for (_, result) in results {
        assert!(matches!(result, Err(Error::Transport { .. })));
    }
}

#[tokio::test]
async fn typed_id_resolves_without_network() {
    let h = Harness::new(|_, _| Err(transport_failure()));
    let resolution = h.gateway.resolve_identifier("id=9445").await.unwrap();

    let found = resolution.found().unwrap();
    assert_eq!(found.canonical_id, 9445);
    assert_eq!(found.strategy, Strategy::ParseIdentifier);
    assert_eq!(h.requests(), 0);
}

#[tokio::test]
async fn name_falls_through_to_exact_name_lookup() {
    let h = Harness::new(|doc, _| Ok(cybertron_lookup(doc)));
    let resolution = h.gateway.resolve_identifier("Cybertr0n").await.unwrap();

    let found = resolution.found().unwrap();
    assert_eq!(found.canonical_id, 9445);
    assert_eq!(found.display_name.as_deref(), Some("Cybertr0n"));
    assert_eq!(found.acronym.as_deref(), Some("CYB"));
    assert_eq!(found.strategy, Strategy::ExactName);
    assert_eq!(h.requests(), 1);
}

#[tokio::test]
async fn resolving_twice_is_idempotent_and_offline() {
    let h = Harness::new(|doc, _| Ok(cybertron_lookup(doc)));
    let first = h.gateway.resolve_identifier("Cybertr0n").await.unwrap();
    let sent = h.requests();

    let second = h.gateway.resolve_identifier("  cybertr0n ").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(h.requests(), sent);
}

#[tokio::test]
async fn trace_records_each_strategy() {
    let h = Harness::new(|doc, _| Ok(cybertron_lookup(doc)));
    let trace = h.gateway.resolve_traced("Cybertr0n").await.unwrap();

    assert!(!trace.from_cache);
    assert_eq!(
        trace.state_of(Strategy::ParseIdentifier),
        Some(&StrategyState::Tried(StepResult::Miss))
    );
    assert_eq!(
        trace.state_of(Strategy::ExactName),
        Some(&StrategyState::Tried(StepResult::Success))
    );
    assert_eq!(
        trace.state_of(Strategy::TableScan),
        Some(&StrategyState::NotTried)
    );
    assert_eq!(
        trace.attempted(),
        vec![Strategy::ParseIdentifier, Strategy::ExactName]
    );
}

#[tokio::test]
async fn failing_exact_name_falls_through_to_server_search() {
    let h = Harness::new(|doc, _| {
        if doc.contains("first: 1,") {
            return Err(transport_failure());
        }
        Ok(data_response(json!({
            "alliances": {"data": [
                {"id": "12", "name": "Knights Radiant", "acronym": "KR"}
            ]}
        })))
    });

    let trace = h.gateway.resolve_traced("the knights radiant").await.unwrap();
    assert_eq!(trace.outcome.canonical_id(), Some(12));
    assert!(matches!(
        trace.state_of(Strategy::ExactName),
        Some(StrategyState::Tried(StepResult::Failed(_)))
    ));
    assert_eq!(
        trace.outcome.found().map(|r| r.strategy),
        Some(Strategy::ServerSearch)
    );
}

#[tokio::test]
async fn unknown_name_exhausts_every_strategy() {
    let h = Harness::new(|doc, _| {
        if doc.contains("page:") {
            return Ok(page_response("alliances", vec![], 1, 1));
        }
        Ok(data_response(json!({ "alliances": {"data": []} })))
    });

    let resolution = h.gateway.resolve_identifier("Nobody Home").await.unwrap();
    assert_eq!(resolution, Resolution::NotFound);
}

#[tokio::test]
async fn resolve_many_keeps_input_order() {
    let h = Harness::new(|doc, _| {
        if doc.contains("entity_0") {
            return Ok(data_response(json!({
                "entity_0": {"data": [{"id": "9445", "name": "Cybertr0n", "acronym": "CYB"}]}
            })));
        }
        Ok(cybertron_lookup(doc))
    });

    let inputs = vec!["77".to_string(), "Cybertr0n".to_string(), "77".to_string()];
    let results = h.gateway.resolve_many(&inputs).await.unwrap();

    let resolved: Vec<Option<u64>> = results.iter().map(|(_, r)| r.canonical_id()).collect();
    assert_eq!(resolved, vec![Some(77), Some(9445), Some(77)]);
    assert_eq!(h.requests(), 1);
}

#[tokio::test]
async fn stale_treaties_are_served_when_the_api_fails() {
    let h = Harness::new(|_, n| {
        if n == 0 {
            return Ok(data_response(json!({
                "alliances": {"data": [{"id": "10", "treaties": [treaty_json(1, "MDP", 10, 20)]}]}
            })));
        }
        Err(transport_failure())
    });
    let id = AllianceId::new(10);

    h.gateway.alliance_treaties(id, FetchOptions::default()).await.unwrap();
    h.clock.advance_secs(7200);

    let treaties = h
        .gateway
        .alliance_treaties(id, FetchOptions::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(treaties.len(), 1);
    assert_eq!(h.requests(), 2);

    let forced = h.gateway.alliance_treaties(id, FetchOptions::refreshed()).await;
    assert!(matches!(forced, Err(Error::Transport { .. })));
}

#[tokio::test]
async fn wars_between_sides_are_merged_and_windowed() {
    let h = Harness::new(|doc, _| {
        let wars = if doc.contains("alliance_id: [1]") {
            vec![
                war_json(10, "2024-05-31T08:00:00+00:00", 1, 2, 30),
                war_json(11, "2024-05-31T09:00:00+00:00", 1, 3, 30),
                war_json(12, "2024-05-01T09:00:00+00:00", 2, 1, 0),
            ]
        } else {
            vec![
                war_json(10, "2024-05-31T08:00:00+00:00", 1, 2, 30),
                war_json(13, "2024-05-30T08:00:00+00:00", 2, 4, 20),
            ]
        };
        Ok(page_response("wars", wars, 1, 1))
    });
    let cutoff = h.clock.now() - chrono::Duration::days(3);

    let wars = h
        .gateway
        .wars_between(&ids(&[1, 4]), &ids(&[2]), cutoff, FetchOptions::default())
        .await
        .unwrap();

    let found: Vec<u64> = wars.iter().map(|w| w.id.get()).collect();
    assert_eq!(found, vec![10, 13]);
    assert_eq!(h.requests(), 2);
}

#[tokio::test]
async fn unallied_scan_applies_the_activity_filter() {
    let h = Harness::new(|doc, _| {
        if doc.contains("page: 1,") {
            return Ok(page_response(
                "nations",
                vec![
                    nation_active_json(1, Some("2024-06-01T11:00:00+00:00"), 0),
                    nation_active_json(2, Some("2024-05-31T12:00:00+00:00"), 0),
                    nation_active_json(3, Some("2024-06-01T11:30:00+00:00"), 0),
                    nation_active_json(4, Some("2024-04-01T12:00:00+00:00"), 0),
                    nation_active_json(5, None, 0),
                    nation_active_json(6, Some("2024-06-01T11:45:00+00:00"), 3),
                ],
                1,
                2,
            ));
        }
        Ok(page_response("nations", vec![], 2, 2))
    });

    let drop_unknown = ActivityFilter::new(chrono::Duration::days(7), MissingActivity::Drop);
    let nations = h
        .gateway
        .unallied_nations(drop_unknown, FetchOptions::default())
        .await
        .unwrap();
    let order: Vec<u64> = nations.iter().map(|n| n.id.get()).collect();
    assert_eq!(order, vec![3, 2]);

    let keep_unknown = ActivityFilter::new(chrono::Duration::days(7), MissingActivity::Keep);
    let nations = h
        .gateway
        .unallied_nations(keep_unknown, FetchOptions::default())
        .await
        .unwrap();
    let order: Vec<u64> = nations.iter().map(|n| n.id.get()).collect();
    assert_eq!(order, vec![3, 2, 5]);
    assert_eq!(h.requests(), 2);
}

#[tokio::test]
async fn data_gateway_port_maps_payloads() {
    let h = Harness::new(|doc, _| Ok(members_response(doc, &[404])));
    let port: &dyn DataGateway = &h.gateway;

    let members = port
        .fetch_entities(EntityKey::AllianceNations(AllianceId::new(5)), FetchOptions::default())
        .await
        .unwrap();
    assert!(matches!(members, EntityPayload::Nations(ref n) if n.len() == 2));

    let missing = port
        .fetch_entities(EntityKey::AllianceNations(AllianceId::new(404)), FetchOptions::default())
        .await
        .unwrap();
    assert!(missing.is_empty());
    assert_eq!(missing, EntityPayload::NotFound);
}

#[tokio::test]
async fn gateways_do_not_share_caches() {
    let a = Harness::new(|doc, _| Ok(members_response(doc, &[])));
    let b = Harness::new(|doc, _| Ok(members_response(doc, &[])));
    let id = AllianceId::new(3);

    a.gateway.alliance_nations(id, FetchOptions::default()).await.unwrap();
    b.gateway.alliance_nations(id, FetchOptions::default()).await.unwrap();
    assert_eq!(a.requests(), 1);
    assert_eq!(b.requests(), 1);

    a.gateway.close();
    assert!(b.gateway.alliance_nations(id, FetchOptions::default()).await.is_ok());
}
