//! Data models

pub mod attempt;
pub mod indicator;

pub use attempt::*;
pub use indicator::*;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::StoreError;

/// Timestamp as stored in `ts` columns: RFC 3339, UTC, microseconds, `Z`.
pub fn to_db_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn from_db_ts(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| StoreError::Timestamp(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn db_timestamps_sort_lexically() {
        let early = Utc.with_ymd_and_hms(2025, 5, 28, 4, 26, 13).unwrap();
        let late = early + chrono::Duration::microseconds(1);

        assert_eq!(to_db_ts(&early), "2025-05-28T04:26:13.000000Z");
        assert!(to_db_ts(&early) < to_db_ts(&late));
        assert_eq!(from_db_ts(&to_db_ts(&late)).unwrap(), late);
    }

    #[test]
    fn offset_timestamps_are_normalized() {
        let parsed = from_db_ts("2025-05-28T06:26:13+02:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 5, 28, 4, 26, 13).unwrap());
        assert!(from_db_ts("yesterday").is_err());
    }
}
