//! Periodic report
//!
//! Computes the seven aggregation views over the last N hours for the
//! email job, highlighting attempts that reuse known exfiltrated passwords.

use std::collections::HashSet;
use std::path::Path;

use chrono::{Duration, Utc};
use honey_store::{IndicatorReport, StoreResult};
use sqlx::SqlitePool;

/// Passwords of interest, one per line. A missing file is an empty set.
pub async fn load_exfiltrated(path: Option<&Path>) -> std::io::Result<HashSet<String>> {
    let Some(path) = path else {
        return Ok(HashSet::new());
    };

    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("Exfiltrated password list {} not found", path.display());
            return Ok(HashSet::new());
        }
        Err(e) => return Err(e),
    };

    Ok(contents
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

pub async fn build_report(pool: &SqlitePool, hours: u32, exfiltrated: &HashSet<String>) -> StoreResult<IndicatorReport> {
    let since = Utc::now() - Duration::hours(i64::from(hours));
    IndicatorReport::compute(pool, since, exfiltrated).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use honey_store::{db, CredentialAttempt, CredentialSink, ExploitAttempt, LoginSubmission};
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_or_absent_list_is_empty() {
        assert!(load_exfiltrated(None).await.unwrap().is_empty());
        assert!(load_exfiltrated(Some(Path::new("/nonexistent/exfil.txt"))).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_skips_blank_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("exfil.txt");
        std::fs::write(&path, "hunter2\r\n\nSummer2024!\n").unwrap();

        let passwords = load_exfiltrated(Some(&path)).await.unwrap();
        assert_eq!(passwords, HashSet::from(["hunter2".to_string(), "Summer2024!".to_string()]));
    }

    #[tokio::test]
    async fn report_covers_recent_window_only() {
        let dir = TempDir::new().unwrap();
        let url = format!("sqlite://{}", dir.path().join("honeypot.db").display());
        let pool = db::create_pool(&url).await.unwrap();
        db::run_migrations(&pool).await.unwrap();
        let sink = CredentialSink::new(pool.clone());
        let now = Utc::now();

        for _ in 0..3 {
            sink.record_credential(&CredentialAttempt::new(LoginSubmission::new("admin", "123"), "1.2.3.4", now))
                .await
                .unwrap();
        }
        sink.record_credential(&CredentialAttempt::new(LoginSubmission::new("root", "hunter2"), "5.6.7.8", now))
            .await
            .unwrap();
        sink.record_credential(&CredentialAttempt::new(
            LoginSubmission::new("old", "old"),
            "7.7.7.7",
            now - Duration::hours(30),
        ))
        .await
        .unwrap();
        sink.record_exploit(&ExploitAttempt::new("5.6.7.8", "/remote/fgt_lang?lang=/../../../..//////////dev/cmdb/sslvpn_websession", now))
            .await
            .unwrap();

        let exfil = HashSet::from(["hunter2".to_string()]);
        let report = build_report(&pool, 24, &exfil).await.unwrap();

        assert_eq!(report.by_ip.len(), 2);
        assert_eq!(report.by_ip[0].ip, "1.2.3.4");
        assert_eq!(report.by_ip[0].count, 3);
        assert_eq!(report.exploits.len(), 1);
        assert_eq!(report.exfiltrated.len(), 1);
        assert_eq!(report.exfiltrated[0].ip, "5.6.7.8");

        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("by_user_pass_ip").is_some());
        assert!(json.get("bad_ips").is_some());
    }
}
