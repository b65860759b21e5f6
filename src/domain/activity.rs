//! Activity filtering for nation scans.
//!
//! Some callers historically treated a nation without a `last_active`
//! timestamp as inactive while others kept it. Rather than pick one, the
//! filter makes the caller state which behaviour it wants.

use chrono::{DateTime, Duration, FixedOffset, Utc};

use super::nation::NationSummary;
use super::time::{cutoff_before, parse_timestamp};

/// What to do with a nation whose activity timestamp is missing or unparseable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingActivity {
    /// Keep the nation as if it were active.
    Keep,
    /// Drop the nation as if it were inactive.
    Drop,
}

/// Filter for unallied-nation scans.
#[derive(Debug, Clone, Copy)]
pub struct ActivityFilter {
    /// Nations inactive for longer than this are dropped.
    pub inactive_after: Duration,
    pub missing_activity: MissingActivity,
    /// Drop nations in vacation mode.
    pub exclude_vacation: bool,
}

/// Nation id of the game administrator, never a recruitment target.
pub const ADMIN_NATION_ID: u64 = 1;

impl ActivityFilter {
    #[must_use]
    pub fn new(inactive_after: Duration, missing_activity: MissingActivity) -> Self {
        Self {
            inactive_after,
            missing_activity,
            exclude_vacation: true,
        }
    }

    /// Apply the filter and sort by most recent activity first.
    ///
    /// Nations without a timestamp that survive the filter sort last.
    #[must_use]
    pub fn apply(
        &self,
        nations: Vec<NationSummary>,
        now: DateTime<Utc>,
        local: FixedOffset,
    ) -> Vec<NationSummary> {
        // A window reaching past the earliest representable time keeps everyone.
        let cutoff = cutoff_before(now, self.inactive_after).unwrap_or(DateTime::<Utc>::MIN_UTC);
        let mut kept: Vec<(Option<DateTime<Utc>>, NationSummary)> = nations
            .into_iter()
            .filter(|n| n.id.get() != ADMIN_NATION_ID)
            .filter(|n| n.alliance_id.is_none())
            .filter(|n| !(self.exclude_vacation && n.vacation_mode_turns > 0))
            .filter_map(|n| {
                let active = n
                    .last_active
                    .as_deref()
                    .and_then(|s| parse_timestamp(s, local));
                match active {
                    Some(ts) if ts < cutoff => None,
                    Some(_) => Some((active, n)),
                    None => match self.missing_activity {
                        MissingActivity::Keep => Some((None, n)),
                        MissingActivity::Drop => None,
                    },
                }
            })
            .collect();
        kept.sort_by(|a, b| b.0.cmp(&a.0));
        kept.into_iter().map(|(_, n)| n).collect()
    }
}
