mod support;

use std::sync::Arc;
use std::time::Duration;

use orbis_gateway::application::executor::{ExecutorSettings, RequestExecutor, RetryPolicy};
use orbis_gateway::application::GatewaySettings;
use orbis_gateway::domain::AllianceId;
use orbis_gateway::port::FetchOptions;
use orbis_gateway::testkit::config::gateway_settings;
use orbis_gateway::testkit::{data_response, ScriptedTransport};
use serde_json::json;
use support::{members_response, Harness};

const MIN_INTERVAL: Duration = Duration::from_millis(250);

fn assert_spaced(transport: &ScriptedTransport, min: Duration) {
    let sent = transport.requests();
    for pair in sent.windows(2) {
        let gap = pair[1].at.duration_since(pair[0].at);
        assert!(gap >= min, "requests only {gap:?} apart");
    }
}

#[tokio::test(start_paused = true)]
async fn consecutive_sends_respect_the_minimum_interval() {
    let transport = Arc::new(ScriptedTransport::new(|_, _| {
        Ok(data_response(json!({ "ok": true })))
    }));
    let executor = RequestExecutor::new(
        transport.clone(),
        ExecutorSettings {
            timeout: Duration::from_secs(5),
            min_interval: MIN_INTERVAL,
            dedupe_ttl: Duration::ZERO,
            retry: RetryPolicy::none(),
        },
    );

    for n in 0..6 {
        executor.execute(&format!("{{ q{n} }}")).await.unwrap();
    }

    assert_eq!(transport.request_count(), 6);
    assert_spaced(&transport, MIN_INTERVAL);
}

#[tokio::test(start_paused = true)]
async fn concurrent_member_chunks_share_one_gate() {
    let settings = GatewaySettings {
        executor: ExecutorSettings {
            min_interval: MIN_INTERVAL,
            ..gateway_settings().executor
        },
        max_ids_per_query: 1,
        max_concurrent: 4,
        ..gateway_settings()
    };
    let h = Harness::with_settings(settings, |doc, _| Ok(members_response(doc, &[])));
    let ids: Vec<AllianceId> = (1..=8).map(AllianceId::new).collect();

    let results = h
        .gateway
        .alliances_nations(&ids, FetchOptions::default())
        .await
        .unwrap();

    assert!(results.iter().all(|(_, r)| r.is_ok()));
    assert_eq!(h.requests(), 8);
    assert_spaced(&h.transport, MIN_INTERVAL);
}

#[tokio::test(start_paused = true)]
async fn identical_documents_inside_the_window_are_sent_once() {
    let transport = Arc::new(ScriptedTransport::new(|_, _| {
        Ok(data_response(json!({ "ok": true })))
    }));
    let executor = RequestExecutor::new(
        transport.clone(),
        ExecutorSettings {
            timeout: Duration::from_secs(5),
            min_interval: MIN_INTERVAL,
            dedupe_ttl: Duration::from_secs(5),
            retry: RetryPolicy::none(),
        },
    );

    executor.execute("{ same }").await.unwrap();
    executor.execute("{ same }").await.unwrap();
    assert_eq!(transport.request_count(), 1);

    tokio::time::advance(Duration::from_secs(6)).await;
    executor.execute("{ same }").await.unwrap();
    assert_eq!(transport.request_count(), 2);
}
