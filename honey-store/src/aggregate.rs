//! Indicator Aggregation
//!
//! The reporting views, computed straight from the append-only tables on
//! every call. Nothing here is cached or written back.
//!
//! Every view takes an inclusive lower bound on `ts` and orders by
//! descending count, breaking ties on the grouping key, so the same window
//! always produces the same output.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::StoreResult;
use crate::models::{from_db_ts, to_db_ts};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IpCount {
    pub ip: String,
    pub count: i64,
    pub first_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialIpCount {
    pub user: String,
    pub password: String,
    pub ip: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserCount {
    pub user: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasswordCount {
    pub password: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExploitCount {
    pub ip: String,
    pub path: String,
    pub count: i64,
    pub first_seen: DateTime<Utc>,
}

/// A captured credential whose password is on the exfiltrated list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExfiltratedCredential {
    pub user: String,
    pub password: String,
    pub ip: String,
    pub observed_at: DateTime<Utc>,
}

/// All seven views over one window, as handed to the email report.
#[derive(Debug, Clone, Serialize)]
pub struct IndicatorReport {
    pub since: DateTime<Utc>,
    pub by_ip: Vec<IpCount>,
    pub by_user_pass_ip: Vec<CredentialIpCount>,
    pub by_user: Vec<UserCount>,
    pub by_password: Vec<PasswordCount>,
    pub exploits: Vec<ExploitCount>,
    pub bad_ips: Vec<String>,
    pub exfiltrated: Vec<ExfiltratedCredential>,
}

impl IndicatorReport {
    pub async fn compute(
        pool: &SqlitePool,
        since: DateTime<Utc>,
        exfiltrated: &HashSet<String>,
    ) -> StoreResult<Self> {
        Ok(Self {
            since,
            by_ip: attempts_by_ip(pool, since).await?,
            by_user_pass_ip: attempts_by_credential_and_ip(pool, since).await?,
            by_user: attempts_by_user(pool, since).await?,
            by_password: attempts_by_password(pool, since).await?,
            exploits: exploits_by_ip_and_path(pool, since).await?,
            bad_ips: bad_ips(pool, since).await?,
            exfiltrated: exfiltrated_credentials(pool, since, exfiltrated).await?,
        })
    }
}

/// Decode a submitted form value for display (`+` is a space).
///
/// Invalid escapes are kept literally and invalid UTF-8 is replaced.
pub fn display_value(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    let bytes = urlencoding::decode_binary(spaced.as_bytes());
    String::from_utf8_lossy(&bytes).into_owned()
}

// ============================================================================
// VIEWS
// ============================================================================

pub async fn attempts_by_ip(pool: &SqlitePool, since: DateTime<Utc>) -> StoreResult<Vec<IpCount>> {
    let rows: Vec<(String, i64, String)> = sqlx::query_as(
        r#"
        SELECT ip, COUNT(*) AS count, MIN(ts) AS first_seen
          FROM honeypot_creds
         WHERE ts >= ?1
      GROUP BY ip
      ORDER BY count DESC, ip ASC
        "#,
    )
    .bind(to_db_ts(&since))
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(ip, count, first_seen)| {
            Ok(IpCount { ip, count, first_seen: from_db_ts(&first_seen)? })
        })
        .collect()
}

pub async fn attempts_by_credential_and_ip(
    pool: &SqlitePool,
    since: DateTime<Utc>,
) -> StoreResult<Vec<CredentialIpCount>> {
    let rows: Vec<(String, String, String, i64)> = sqlx::query_as(
        r#"
        SELECT user, password, ip, COUNT(*) AS count
          FROM honeypot_creds
         WHERE ts >= ?1
      GROUP BY user, password, ip
      ORDER BY count DESC, user ASC, password ASC, ip ASC
        "#,
    )
    .bind(to_db_ts(&since))
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(user, password, ip, count)| CredentialIpCount {
            user: display_value(&user),
            password: display_value(&password),
            ip,
            count,
        })
        .collect())
}

pub async fn attempts_by_user(pool: &SqlitePool, since: DateTime<Utc>) -> StoreResult<Vec<UserCount>> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT user, COUNT(*) AS count
          FROM honeypot_creds
         WHERE ts >= ?1
      GROUP BY user
      ORDER BY count DESC, user ASC
        "#,
    )
    .bind(to_db_ts(&since))
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(user, count)| UserCount { user: display_value(&user), count })
        .collect())
}

pub async fn attempts_by_password(pool: &SqlitePool, since: DateTime<Utc>) -> StoreResult<Vec<PasswordCount>> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT password, COUNT(*) AS count
          FROM honeypot_creds
         WHERE ts >= ?1
      GROUP BY password
      ORDER BY count DESC, password ASC
        "#,
    )
    .bind(to_db_ts(&since))
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(password, count)| PasswordCount { password: display_value(&password), count })
        .collect())
}

pub async fn exploits_by_ip_and_path(pool: &SqlitePool, since: DateTime<Utc>) -> StoreResult<Vec<ExploitCount>> {
    let rows: Vec<(String, String, i64, String)> = sqlx::query_as(
        r#"
        SELECT ip, path, COUNT(*) AS count, MIN(ts) AS first_seen
          FROM symlink_exploits
         WHERE ts >= ?1
      GROUP BY ip, path
      ORDER BY count DESC, ip ASC, path ASC
        "#,
    )
    .bind(to_db_ts(&since))
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(ip, path, count, first_seen)| {
            Ok(ExploitCount { ip, path, count, first_seen: from_db_ts(&first_seen)? })
        })
        .collect()
}

/// Distinct credential-submitting addresses in the window.
pub async fn bad_ips(pool: &SqlitePool, since: DateTime<Utc>) -> StoreResult<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT DISTINCT ip FROM honeypot_creds WHERE ts >= ?1 ORDER BY ip ASC",
    )
    .bind(to_db_ts(&since))
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|(ip,)| ip).collect())
}

/// Attempts whose password (raw or decoded) is in `exfiltrated`.
///
/// Ordered by time, then address.
pub async fn exfiltrated_credentials(
    pool: &SqlitePool,
    since: DateTime<Utc>,
    exfiltrated: &HashSet<String>,
) -> StoreResult<Vec<ExfiltratedCredential>> {
    if exfiltrated.is_empty() {
        return Ok(Vec::new());
    }

    let rows: Vec<(String, String, String, String)> = sqlx::query_as(
        r#"
        SELECT user, password, ip, ts
          FROM honeypot_creds
         WHERE ts >= ?1
      ORDER BY ts ASC, ip ASC, id ASC
        "#,
    )
    .bind(to_db_ts(&since))
    .fetch_all(pool)
    .await?;

    let mut hits = Vec::new();
    for (user, raw_password, ip, ts) in rows {
        let password = display_value(&raw_password);
        if exfiltrated.contains(&password) || exfiltrated.contains(&raw_password) {
            hits.push(ExfiltratedCredential {
                user: display_value(&user),
                password,
                ip,
                observed_at: from_db_ts(&ts)?,
            });
        }
    }
    Ok(hits)
}
