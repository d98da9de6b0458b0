use std::fmt;

use chrono::{DateTime, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

/// A timezone-independent calendar-day key, always `YYYY-MM-DD`.
///
/// Derived from the *local* wall-clock date of the selected instant, so the
/// same physical day maps to the same key regardless of the client's UTC
/// offset. Every date-keyed read and write path goes through this type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DateKey(String);

impl DateKey {
    /// The local calendar day of `t` in `t`'s own timezone.
    pub fn from_local<Tz: TimeZone>(t: &DateTime<Tz>) -> Self {
        Self(t.naive_local().date().format("%Y-%m-%d").to_string())
    }

    /// Validate an already-formatted key (store path segments, saved prefs).
    pub fn parse(s: &str) -> Option<Self> {
        let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
        // Round-trip guard: rejects non-canonical forms like "2025-3-1".
        if date.format("%Y-%m-%d").to_string() == s {
            Some(Self(s.to_string()))
        } else {
            None
        }
    }

    pub fn from_naive(date: NaiveDate) -> Self {
        Self(date.format("%Y-%m-%d").to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    fn local_midnight(offset_hours: i32) -> DateTime<FixedOffset> {
        let offset = FixedOffset::east_opt(offset_hours * 3600).unwrap();
        offset.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap()
    }

    #[test]
    fn local_midnight_normalizes_to_same_key_in_any_offset() {
        for hours in [-11, -5, 0, 2, 5, 13] {
            let t = local_midnight(hours);
            assert_eq!(
                DateKey::from_local(&t).as_str(),
                "2025-03-10",
                "offset {hours}h"
            );
        }
    }

    #[test]
    fn late_evening_stays_on_local_day() {
        // 23:30 local in UTC+13 is already 2025-03-09 in UTC; the key must
        // still be the local day.
        let offset = FixedOffset::east_opt(13 * 3600).unwrap();
        let t = offset.with_ymd_and_hms(2025, 3, 10, 23, 30, 0).unwrap();
        assert_eq!(DateKey::from_local(&t).as_str(), "2025-03-10");
    }

    #[test]
    fn utc_passthrough() {
        let t = Utc.with_ymd_and_hms(2025, 12, 31, 12, 0, 0).unwrap();
        assert_eq!(DateKey::from_local(&t).as_str(), "2025-12-31");
    }

    #[test]
    fn parse_accepts_canonical_only() {
        assert!(DateKey::parse("2025-03-10").is_some());
        assert!(DateKey::parse("2025-3-10").is_none());
        assert!(DateKey::parse("2025-03-10T00:00:00Z").is_none());
        assert!(DateKey::parse("not-a-date").is_none());
        assert!(DateKey::parse("2025-02-30").is_none());
    }
}
