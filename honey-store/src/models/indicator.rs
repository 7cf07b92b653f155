//! Indicator model - a source address as reported to threat-intel feeds

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use super::{from_db_ts, to_db_ts};
use crate::error::StoreResult;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Indicator {
    pub ip: String,
    /// Earliest credential attempt from this address anywhere in the store
    pub first_seen: DateTime<Utc>,
}

impl Indicator {
    /// Source addresses whose earliest attempt is strictly after `floor`.
    ///
    /// Ordered by first sighting, then address. Rows whose address is not
    /// a literal IP (e.g. a missing forwarded-for header) are never
    /// indicators and are left out.
    pub async fn first_seen_after(pool: &SqlitePool, floor: DateTime<Utc>) -> StoreResult<Vec<Self>> {
        Self::select(pool, floor, None).await
    }

    /// Like [`Indicator::first_seen_after`], but only addresses first seen
    /// at or before `until`.
    ///
    /// Attempts are stamped before their insert commits, so rows stamped
    /// just before a read may still be in flight. Capping the selection
    /// leaves them for a later pass instead of moving a watermark past
    /// them.
    pub async fn first_seen_between(
        pool: &SqlitePool,
        floor: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> StoreResult<Vec<Self>> {
        Self::select(pool, floor, Some(until)).await
    }

    async fn select(pool: &SqlitePool, floor: DateTime<Utc>, until: Option<DateTime<Utc>>) -> StoreResult<Vec<Self>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT ip, MIN(ts) AS first_seen
              FROM honeypot_creds
          GROUP BY ip
            HAVING MIN(ts) > ?1
               AND (?2 IS NULL OR MIN(ts) <= ?2)
          ORDER BY first_seen ASC, ip ASC
            "#,
        )
        .bind(to_db_ts(&floor))
        .bind(until.as_ref().map(to_db_ts))
        .fetch_all(pool)
        .await?;

        let mut indicators = Vec::with_capacity(rows.len());
        for (ip, first_seen) in rows {
            if ip.parse::<IpAddr>().is_err() {
                tracing::debug!("Skipping non-address source {:?}", ip);
                continue;
            }
            indicators.push(Indicator {
                ip,
                first_seen: from_db_ts(&first_seen)?,
            });
        }
        Ok(indicators)
    }

    pub fn is_ipv6(&self) -> bool {
        matches!(self.ip.parse::<IpAddr>(), Ok(IpAddr::V6(_)))
    }
}
