//! Resolved identifiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which resolution step produced an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Bare numeric id or an id embedded in a URL.
    ParseIdentifier,
    /// Exact name lookup through a targeted query.
    ExactName,
    /// Server-side search on a secondary name field.
    ServerSearch,
    /// Paginated scan over the full entity table.
    TableScan,
    /// Scan of previously persisted snapshots.
    LocalSnapshot,
}

impl Strategy {
    /// The cascade order used when none is configured.
    pub const DEFAULT_ORDER: [Self; 5] = [
        Self::ParseIdentifier,
        Self::ExactName,
        Self::ServerSearch,
        Self::TableScan,
        Self::LocalSnapshot,
    ];

    /// Whether the step talks to the remote API.
    #[must_use]
    pub const fn is_remote(self) -> bool {
        matches!(self, Self::ExactName | Self::ServerSearch | Self::TableScan)
    }
}

/// Mapping from user-supplied text to a canonical id.
///
/// Never mutated once built; a newer resolution for the same normalized
/// input replaces the cached one wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedIdentifier {
    pub input_normalized: String,
    pub canonical_id: u64,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub acronym: Option<String>,
    pub strategy: Strategy,
    pub resolved_at: DateTime<Utc>,
}

/// Outcome of a resolution. `NotFound` is an ordinary answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(ResolvedIdentifier),
    NotFound,
}

impl Resolution {
    #[must_use]
    pub fn found(&self) -> Option<&ResolvedIdentifier> {
        match self {
            Self::Found(r) => Some(r),
            Self::NotFound => None,
        }
    }

    #[must_use]
    pub fn canonical_id(&self) -> Option<u64> {
        self.found().map(|r| r.canonical_id)
    }

    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}
