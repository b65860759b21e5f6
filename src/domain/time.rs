//! Timestamp parsing and cutoff helpers.
//!
//! The API mixes RFC 3339 timestamps with naive `YYYY-MM-DD HH:MM:SS` values.
//! Naive values are interpreted in the configured offset before being
//! converted to UTC, so cutoff comparisons never mix naive and aware times.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%z", "%Y-%m-%d %H:%M:%S%:z"];

/// Parse an API timestamp into UTC.
///
/// Returns `None` for empty or unrecognised input rather than failing: a
/// missing timestamp is data, not an error.
#[must_use]
pub fn parse_timestamp(raw: &str, local: FixedOffset) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return localize(naive, local);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return localize(date.and_hms_opt(0, 0, 0)?, local);
    }
    None
}

fn localize(naive: NaiveDateTime, local: FixedOffset) -> Option<DateTime<Utc>> {
    local
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse a configured timezone: `UTC`, `Z`, or a `±HH:MM` offset.
#[must_use]
pub fn parse_offset(raw: &str) -> Option<FixedOffset> {
    let s = raw.trim();
    if s.eq_ignore_ascii_case("utc") || s.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0);
    }
    s.parse::<FixedOffset>().ok()
}

/// Parse a look-back window such as `6h`, `3d`, `2w` or `2m`.
///
/// A month is approximated as 30 days. Windows too large for a
/// [`Duration`] are `None`.
#[must_use]
pub fn parse_lookback(raw: &str) -> Option<Duration> {
    let s = raw.trim().to_ascii_lowercase();
    let unit = s.chars().last()?;
    let qty: i64 = s[..s.len() - unit.len_utf8()].trim().parse().ok()?;
    if qty <= 0 {
        return None;
    }
    match unit {
        'h' => Duration::try_hours(qty),
        'd' => Duration::try_days(qty),
        'w' => Duration::try_weeks(qty),
        'm' => Duration::try_days(qty.checked_mul(30)?),
        _ => None,
    }
}

/// `now - window`, or `None` when that lies outside the representable range.
#[must_use]
pub fn cutoff_before(now: DateTime<Utc>, window: Duration) -> Option<DateTime<Utc>> {
    now.checked_sub_signed(window)
}

/// Truncate a timestamp to the start of its hour.
#[must_use]
pub fn floor_to_hour(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_nanosecond(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_minute(0))
        .unwrap_or(ts)
}
