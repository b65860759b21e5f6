#![allow(dead_code)]

use std::sync::Arc;

use orbis_gateway::adapter::outbound::store::MemoryRecordStore;
use orbis_gateway::application::{Gateway, GatewayBuilder, GatewaySettings};
use orbis_gateway::error::Result;
use orbis_gateway::testkit::config::gateway_settings;
use orbis_gateway::testkit::fixtures::{alliance_json, nation_json};
use orbis_gateway::testkit::{data_response, ManualClock, ScriptedTransport};
use serde_json::{json, Map, Value};

/// A gateway over a scripted transport, an in-memory store and a manual clock.
pub struct Harness {
    pub gateway: Gateway,
    pub transport: Arc<ScriptedTransport>,
    pub store: Arc<MemoryRecordStore>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str, usize) -> Result<Value> + Send + Sync + 'static,
    {
        Self::with_settings(gateway_settings(), responder)
    }

    pub fn with_settings<F>(settings: GatewaySettings, responder: F) -> Self
    where
        F: Fn(&str, usize) -> Result<Value> + Send + Sync + 'static,
    {
        Self::with_transport(settings, ScriptedTransport::new(responder))
    }

    pub fn with_transport(settings: GatewaySettings, transport: ScriptedTransport) -> Self {
        let transport = Arc::new(transport);
        let store = Arc::new(MemoryRecordStore::new());
        let clock = Arc::new(ManualClock::fixed());
        let gateway = GatewayBuilder::new(settings)
            .transport(transport.clone())
            .store(store.clone())
            .clock(clock.clone())
            .build()
            .expect("gateway builds");
        Self {
            gateway,
            transport,
            store,
            clock,
        }
    }

    pub fn requests(&self) -> usize {
        self.transport.request_count()
    }
}

/// Alliance ids named by `entity_<id>: alliances(id: <id>)` sub-queries.
pub fn aliased_ids(document: &str) -> Vec<u64> {
    document
        .split("entity_")
        .skip(1)
        .filter_map(|rest| {
            let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
            digits.parse().ok()
        })
        .collect()
}

/// Alliance block with `members` nations, as one alias carries it.
pub fn alliance_block(id: u64, members: usize) -> Value {
    let nations: Vec<Value> = (0..members as u64)
        .map(|n| nation_json(id * 100 + n, &format!("Nation {id}-{n}"), id))
        .collect();
    let mut alliance = alliance_json(id, &format!("Alliance {id}"), "ALL");
    alliance["nations"] = Value::Array(nations);
    json!({ "data": [alliance] })
}

/// Composite member response for every aliased id except `missing`.
pub fn members_response(document: &str, missing: &[u64]) -> Value {
    let mut data = Map::new();
    for id in aliased_ids(document) {
        let block = if missing.contains(&id) {
            json!({ "data": [] })
        } else {
            alliance_block(id, 2)
        };
        data.insert(format!("entity_{id}"), block);
    }
    data_response(Value::Object(data))
}
