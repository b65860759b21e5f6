//! JSON builders for remote records, shaped like the API returns them.

use serde_json::{json, Value};

/// Alliance identity row.
pub fn alliance_json(id: u64, name: &str, acronym: &str) -> Value {
    json!({ "id": id.to_string(), "name": name, "acronym": acronym })
}

/// Minimal nation row.
pub fn nation_json(id: u64, name: &str, alliance_id: u64) -> Value {
    json!({
        "id": id.to_string(),
        "nation_name": name,
        "leader_name": format!("Leader of {name}"),
        "alliance_id": alliance_id.to_string(),
        "num_cities": 10,
        "score": 1500.5,
        "vacation_mode_turns": 0,
        "last_active": "2024-06-01T10:00:00+00:00",
    })
}

/// Nation row with an explicit `last_active` (or none).
pub fn nation_active_json(id: u64, last_active: Option<&str>, vacation_turns: u32) -> Value {
    json!({
        "id": id.to_string(),
        "nation_name": format!("Nation {id}"),
        "leader_name": format!("Leader {id}"),
        "alliance_id": "0",
        "num_cities": 5,
        "score": 500.0,
        "vacation_mode_turns": vacation_turns,
        "last_active": last_active,
    })
}

/// War row between two alliances, started at `date`.
pub fn war_json(
    id: u64,
    date: &str,
    att_alliance: u64,
    def_alliance: u64,
    turns_left: i32,
) -> Value {
    json!({
        "id": id.to_string(),
        "date": date,
        "end_date": null,
        "war_type": "ORDINARY",
        "turns_left": turns_left,
        "att_id": (id * 10).to_string(),
        "def_id": (id * 10 + 1).to_string(),
        "att_alliance_id": att_alliance.to_string(),
        "def_alliance_id": def_alliance.to_string(),
        "attacks": [],
    })
}

/// Treaty row.
pub fn treaty_json(id: u64, kind: &str, a1: u64, a2: u64) -> Value {
    json!({
        "id": id.to_string(),
        "date": "2024-01-01 00:00:00",
        "treaty_type": kind,
        "turns_left": 120,
        "alliance1_id": a1.to_string(),
        "alliance2_id": a2.to_string(),
        "approved": true,
    })
}
