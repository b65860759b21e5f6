//! Alliance records.

use serde::{Deserialize, Serialize};

use super::id::AllianceId;

/// Lightweight alliance reference, as embedded in nations and treaties and
/// as returned by name lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllianceRef {
    pub id: AllianceId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub acronym: Option<String>,
}

/// Alliance with the summary fields the gateway requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alliance {
    pub id: AllianceId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub acronym: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub accept_members: Option<bool>,
    #[serde(default)]
    pub flag: Option<String>,
    #[serde(default)]
    pub discord_link: Option<String>,
}

impl From<&Alliance> for AllianceRef {
    fn from(a: &Alliance) -> Self {
        Self {
            id: a.id,
            name: a.name.clone(),
            acronym: a.acronym.clone(),
        }
    }
}
