//! Attempt models
//!
//! Rows are append-only: nothing in the workspace updates or deletes them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use super::to_db_ts;
use crate::error::StoreResult;
use crate::sink::LoginSubmission;

/// One POST to the login check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialAttempt {
    /// Raw submitted encoding, or the blank placeholder
    pub username: String,
    pub password: String,
    pub source_ip: String,
    pub observed_at: DateTime<Utc>,
}

/// One request for a path the portal does not serve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExploitAttempt {
    pub source_ip: String,
    pub path: String,
    pub observed_at: DateTime<Utc>,
}

impl CredentialAttempt {
    pub fn new(submission: LoginSubmission, source_ip: impl Into<String>, observed_at: DateTime<Utc>) -> Self {
        Self {
            username: submission.username,
            password: submission.password,
            source_ip: source_ip.into(),
            observed_at,
        }
    }

    /// `username\tpassword\tsource_ip\ttimestamp\n`
    ///
    /// Control characters inside fields are percent-escaped so that one
    /// attempt is always exactly one line.
    pub fn to_log_line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\n",
            escape_field(&self.username),
            escape_field(&self.password),
            escape_field(&self.source_ip),
            self.observed_at.to_rfc3339(),
        )
    }

    pub(crate) async fn insert(&self, pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO honeypot_creds (user, password, ip, ts) VALUES (?1, ?2, ?3, ?4)")
            .bind(&self.username)
            .bind(&self.password)
            .bind(&self.source_ip)
            .bind(to_db_ts(&self.observed_at))
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Number of attempts observed at or after `since`.
    pub async fn count_since(pool: &SqlitePool, since: DateTime<Utc>) -> StoreResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM honeypot_creds WHERE ts >= ?1")
            .bind(to_db_ts(&since))
            .fetch_one(pool)
            .await?;
        Ok(count)
    }
}

impl ExploitAttempt {
    pub fn new(source_ip: impl Into<String>, path: impl Into<String>, observed_at: DateTime<Utc>) -> Self {
        Self {
            source_ip: source_ip.into(),
            path: path.into(),
            observed_at,
        }
    }

    pub(crate) async fn insert(&self, pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO symlink_exploits (ip, path, ts) VALUES (?1, ?2, ?3)")
            .bind(&self.source_ip)
            .bind(&self.path)
            .bind(to_db_ts(&self.observed_at))
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn count_since(pool: &SqlitePool, since: DateTime<Utc>) -> StoreResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM symlink_exploits WHERE ts >= ?1")
            .bind(to_db_ts(&since))
            .fetch_one(pool)
            .await?;
        Ok(count)
    }
}

fn escape_field(value: &str) -> String {
    if !value.contains(&['\t', '\n', '\r'][..]) {
        return value.to_string();
    }
    value
        .replace('\t', "%09")
        .replace('\n', "%0A")
        .replace('\r', "%0D")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn log_line_is_tab_separated() {
        let attempt = CredentialAttempt {
            username: "admin".into(),
            password: "p%40ss".into(),
            source_ip: "1.2.3.4".into(),
            observed_at: Utc.with_ymd_and_hms(2025, 5, 28, 4, 26, 13).unwrap(),
        };

        assert_eq!(
            attempt.to_log_line(),
            "admin\tp%40ss\t1.2.3.4\t2025-05-28T04:26:13+00:00\n"
        );
    }

    #[test]
    fn log_line_never_splits_a_record() {
        let attempt = CredentialAttempt {
            username: "a\tb".into(),
            password: "line\nbreak\r".into(),
            source_ip: "1.2.3.4".into(),
            observed_at: Utc::now(),
        };

        let line = attempt.to_log_line();
        assert_eq!(line.matches('\n').count(), 1);
        assert_eq!(line.matches('\t').count(), 3);
        assert!(line.starts_with("a%09b\tline%0Abreak%0D\t"));
    }
}
