//! Nation records.
//!
//! Fields the API may omit are optional or defaulted; unknown fields are
//! ignored at the deserialization boundary.

use serde::{Deserialize, Serialize};

use super::alliance::Alliance;
use super::id::{optional_id, AllianceId, NationId};

/// Nation as returned by alliance member and nation lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nation {
    pub id: NationId,
    #[serde(default)]
    pub nation_name: String,
    #[serde(default)]
    pub leader_name: String,
    #[serde(default, deserialize_with = "optional_id")]
    pub alliance_id: Option<AllianceId>,
    #[serde(default)]
    pub alliance_position: Option<String>,
    #[serde(default)]
    pub alliance: Option<Alliance>,
    #[serde(default)]
    pub continent: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub discord_id: Option<String>,
    #[serde(default)]
    pub war_policy: Option<String>,
    #[serde(default)]
    pub domestic_policy: Option<String>,
    #[serde(default)]
    pub num_cities: u32,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub population: Option<u64>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub last_active: Option<String>,
    #[serde(default)]
    pub vacation_mode_turns: u32,
    #[serde(default)]
    pub beige_turns: u32,
    #[serde(default)]
    pub soldiers: u64,
    #[serde(default)]
    pub tanks: u64,
    #[serde(default)]
    pub aircraft: u64,
    #[serde(default)]
    pub ships: u64,
    #[serde(default)]
    pub missiles: u64,
    #[serde(default)]
    pub nukes: u64,
    #[serde(default)]
    pub spies: Option<u64>,
    #[serde(default)]
    pub wars_won: Option<u32>,
    #[serde(default)]
    pub wars_lost: Option<u32>,
    #[serde(default)]
    pub cities: Vec<City>,
}

/// City with the fields military-capacity calculations read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub infrastructure: f64,
    #[serde(default)]
    pub barracks: u32,
    #[serde(default)]
    pub factory: u32,
    #[serde(default)]
    pub hangar: u32,
    #[serde(default)]
    pub drydock: u32,
}

impl Nation {
    /// Whether the nation is currently in vacation mode.
    #[must_use]
    pub const fn in_vacation_mode(&self) -> bool {
        self.vacation_mode_turns > 0
    }
}

/// The compact row used by whole-table scans (recruitment).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NationSummary {
    pub id: NationId,
    #[serde(default)]
    pub nation_name: String,
    #[serde(default)]
    pub leader_name: String,
    #[serde(default, deserialize_with = "optional_id")]
    pub alliance_id: Option<AllianceId>,
    #[serde(default)]
    pub last_active: Option<String>,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub num_cities: u32,
    #[serde(default)]
    pub vacation_mode_turns: u32,
}

/// How a single nation is looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NationLookup {
    Id(NationId),
    Name(String),
    Leader(String),
}
