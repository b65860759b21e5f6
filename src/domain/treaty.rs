//! Treaty records.

use serde::{Deserialize, Serialize};

use super::alliance::AllianceRef;
use super::id::{AllianceId, TreatyId};

/// A treaty between two alliances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Treaty {
    pub id: TreatyId,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub treaty_type: String,
    #[serde(default)]
    pub treaty_url: Option<String>,
    #[serde(default)]
    pub turns_left: i32,
    pub alliance1_id: AllianceId,
    pub alliance2_id: AllianceId,
    #[serde(default)]
    pub approved: Option<bool>,
    #[serde(default)]
    pub alliance1: Option<AllianceRef>,
    #[serde(default)]
    pub alliance2: Option<AllianceRef>,
}

impl Treaty {
    /// The alliance on the other side of the treaty from `alliance`.
    #[must_use]
    pub fn counterpart(&self, alliance: AllianceId) -> Option<AllianceId> {
        if self.alliance1_id == alliance {
            Some(self.alliance2_id)
        } else if self.alliance2_id == alliance {
            Some(self.alliance1_id)
        } else {
            None
        }
    }
}
