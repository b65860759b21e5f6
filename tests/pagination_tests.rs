use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use orbis_gateway::application::executor::{ExecutorSettings, RequestExecutor, RetryPolicy};
use orbis_gateway::application::pagination::{PageOptions, PagedQuery, PaginationEngine};
use orbis_gateway::testkit::{data_response, ScriptedTransport};
use serde_json::{json, Value};

/// Pages of `{ id, date }` items under the `events` root.
struct Events;

impl PagedQuery for Events {
    fn root_field(&self) -> &str {
        "events"
    }

    fn page_document(&self, page: u32, first: u32) -> String {
        format!("{{ events(first: {first}, page: {page}) {{ data {{ id date }} }} }}")
    }

    fn item_timestamp(&self, item: &Value) -> Option<DateTime<Utc>> {
        item["date"].as_str()?.parse().ok()
    }
}

fn page_number(document: &str) -> usize {
    document
        .split("page: ")
        .nth(1)
        .and_then(|rest| rest.split(')').next())
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

/// A transport serving `sizes[page - 1]` items per page without paginator info.
fn pages(sizes: Vec<usize>, dates: Vec<&'static str>) -> Arc<ScriptedTransport> {
    Arc::new(ScriptedTransport::new(move |doc, _| {
        let page = page_number(doc);
        let count = sizes.get(page.wrapping_sub(1)).copied().unwrap_or(0);
        let date = dates.get(page.wrapping_sub(1)).copied().unwrap_or("2024-06-01T00:00:00Z");
        let items: Vec<Value> = (0..count)
            .map(|i| json!({ "id": page * 100 + i, "date": date }))
            .collect();
        Ok(data_response(json!({ "events": { "data": items } })))
    }))
}

fn engine(transport: Arc<ScriptedTransport>) -> PaginationEngine {
    let settings = ExecutorSettings {
        timeout: Duration::from_secs(5),
        min_interval: Duration::ZERO,
        dedupe_ttl: Duration::ZERO,
        retry: RetryPolicy::none(),
    };
    PaginationEngine::new(Arc::new(RequestExecutor::new(transport, settings)))
}

#[tokio::test]
async fn empty_page_terminates_the_run() {
    let transport = pages(vec![5, 5, 5, 0], vec![]);
    let items = engine(transport.clone())
        .fetch_all_pages(&Events, PageOptions::default())
        .await
        .unwrap();

    assert_eq!(items.len(), 15);
    assert_eq!(transport.request_count(), 4);
}

#[tokio::test]
async fn page_older_than_cutoff_stops_the_run() {
    let transport = pages(
        vec![5, 5, 5, 5],
        vec![
            "2024-06-01T00:00:00Z",
            "2024-05-20T00:00:00Z",
            "2024-04-01T00:00:00Z",
            "2024-03-01T00:00:00Z",
        ],
    );
    let cutoff = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
    let items = engine(transport.clone())
        .fetch_all_pages(&Events, PageOptions::default().with_cutoff(Some(cutoff)))
        .await
        .unwrap();

    assert_eq!(items.len(), 10);
    assert_eq!(transport.request_count(), 3);
    assert!(transport.documents().iter().all(|d| !d.contains("page: 4)")));
}

#[tokio::test]
async fn mixed_page_continues_past_cutoff() {
    let transport = Arc::new(ScriptedTransport::new(|doc, _| {
        let items = match page_number(doc) {
            1 => vec![
                json!({"id": 1, "date": "2024-06-01T00:00:00Z"}),
                json!({"id": 2, "date": "2024-01-01T00:00:00Z"}),
            ],
            2 => vec![json!({"id": 3, "date": "2024-01-01T00:00:00Z"})],
            _ => vec![],
        };
        Ok(data_response(json!({ "events": { "data": items } })))
    }));
    let cutoff = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
    let items = engine(transport.clone())
        .fetch_all_pages(&Events, PageOptions::default().with_cutoff(Some(cutoff)))
        .await
        .unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(transport.request_count(), 2);
}
