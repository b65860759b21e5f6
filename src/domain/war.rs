//! War records and cutoff-window checks.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use super::id::{optional_id, AllianceId, NationId, WarId};
use super::time::parse_timestamp;

/// A war between two nations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct War {
    pub id: WarId,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub war_type: Option<String>,
    #[serde(default)]
    pub turns_left: i32,
    pub att_id: NationId,
    pub def_id: NationId,
    #[serde(default, deserialize_with = "optional_id")]
    pub att_alliance_id: Option<AllianceId>,
    #[serde(default, deserialize_with = "optional_id")]
    pub def_alliance_id: Option<AllianceId>,
    #[serde(default, deserialize_with = "optional_id")]
    pub winner_id: Option<NationId>,
    #[serde(default)]
    pub att_money_looted: Option<f64>,
    #[serde(default)]
    pub def_money_looted: Option<f64>,
    #[serde(default)]
    pub att_infra_destroyed_value: Option<f64>,
    #[serde(default)]
    pub def_infra_destroyed_value: Option<f64>,
    #[serde(default)]
    pub attacks: Vec<WarAttack>,
}

/// One attack inside a war.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarAttack {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, rename = "type")]
    pub attack_type: Option<String>,
    #[serde(default)]
    pub att_id: Option<String>,
    #[serde(default)]
    pub money_stolen: Option<f64>,
}

impl War {
    /// Whether the war still has turns left.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.turns_left > 0
    }

    /// Most recent known timestamp: the latest attack, end, or start date.
    #[must_use]
    pub fn latest_activity(&self, local: FixedOffset) -> Option<DateTime<Utc>> {
        let attack_dates = self
            .attacks
            .iter()
            .filter_map(|a| a.date.as_deref())
            .filter_map(|d| parse_timestamp(d, local));
        let own_dates = [self.date.as_deref(), self.end_date.as_deref()]
            .into_iter()
            .flatten()
            .filter_map(|d| parse_timestamp(d, local));
        attack_dates.chain(own_dates).max()
    }

    /// Whether the war belongs to a window starting at `cutoff`.
    ///
    /// Active wars are always in window; finished wars are in window when any
    /// attack, start, or end date is at or after the cutoff.
    #[must_use]
    pub fn in_window(&self, cutoff: DateTime<Utc>, local: FixedOffset) -> bool {
        if self.is_active() {
            return true;
        }
        self.latest_activity(local).is_some_and(|ts| ts >= cutoff)
    }

    /// Whether the war sits between `home` and `away`, in either direction.
    #[must_use]
    pub fn is_between(&self, home: &[AllianceId], away: &[AllianceId]) -> bool {
        let (Some(att), Some(def)) = (self.att_alliance_id, self.def_alliance_id) else {
            return false;
        };
        (home.contains(&att) && away.contains(&def)) || (home.contains(&def) && away.contains(&att))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn war(json: serde_json::Value) -> War {
        serde_json::from_value(json).unwrap()
    }

    fn cutoff() -> DateTime<Utc> {
        parse_timestamp("2024-05-10T00:00:00Z", utc()).unwrap()
    }

    #[test]
    fn finished_old_war_is_outside_window() {
        let w = war(serde_json::json!({
            "id": "1", "att_id": "2", "def_id": "3",
            "date": "2024-05-01T00:00:00Z", "end_date": "2024-05-06T00:00:00Z",
            "turns_left": 0
        }));
        assert!(!w.in_window(cutoff(), utc()));
    }

    #[test]
    fn recent_attack_pulls_war_into_window() {
        let w = war(serde_json::json!({
            "id": "1", "att_id": "2", "def_id": "3",
            "date": "2024-05-01T00:00:00Z",
            "attacks": [{"date": "2024-05-11T08:00:00Z"}]
        }));
        assert!(w.in_window(cutoff(), utc()));
    }

    #[test]
    fn active_war_is_always_in_window() {
        let w = war(serde_json::json!({
            "id": "1", "att_id": "2", "def_id": "3",
            "date": "2024-04-01T00:00:00Z", "turns_left": 12
        }));
        assert!(w.in_window(cutoff(), utc()));
    }

    #[test]
    fn between_checks_both_directions() {
        let w = war(serde_json::json!({
            "id": "1", "att_id": "2", "def_id": "3",
            "att_alliance_id": "20", "def_alliance_id": "10"
        }));
        let home = [AllianceId::new(10)];
        let away = [AllianceId::new(20)];
        assert!(w.is_between(&home, &away));
        assert!(w.is_between(&away, &home));
        assert!(!w.is_between(&home, &[AllianceId::new(30)]));
    }

    #[test]
    fn unallied_side_is_never_between() {
        let w = war(serde_json::json!({
            "id": "1", "att_id": "2", "def_id": "3",
            "att_alliance_id": "0", "def_alliance_id": "10"
        }));
        assert!(!w.is_between(&[AllianceId::new(10)], &[AllianceId::new(20)]));
    }
}
