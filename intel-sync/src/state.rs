//! Sync State Tracker
//!
//! One watermark per destination: the `first_seen` of the newest indicator
//! already handed to it. Stored as `state_<tag>.txt` holding an RFC 3339
//! timestamp.
//!
//! A missing, empty or unparsable file reads as the Unix epoch, so the
//! worst a damaged file can do is cause a re-send. Writes go through a
//! temp file and a rename, so a torn write never becomes a watermark.

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::io::AsyncWriteExt;

use crate::error::{SyncError, SyncResult};

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9]+").unwrap());

/// `"FortiGate VPN-SSL Honeypot"` -> `"FortiGate_VPN_SSL_Honeypot"`
pub fn sanitize_tag(name: &str) -> String {
    NON_ALNUM.replace_all(name, "_").trim_matches('_').to_string()
}

#[derive(Debug, Clone)]
pub struct WatermarkStore {
    dir: PathBuf,
}

impl WatermarkStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("state_{}.txt", sanitize_tag(name)))
    }

    /// Last reported timestamp for `name`, or the epoch.
    pub async fn load(&self, name: &str) -> DateTime<Utc> {
        let path = self.path_for(name);

        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return DateTime::UNIX_EPOCH,
            Err(e) => {
                tracing::warn!("Cannot read {}: {}, starting from epoch", path.display(), e);
                return DateTime::UNIX_EPOCH;
            }
        };

        match DateTime::parse_from_rfc3339(contents.trim()) {
            Ok(at) => at.with_timezone(&Utc),
            Err(e) => {
                tracing::warn!("Unparsable watermark in {}: {}, starting from epoch", path.display(), e);
                DateTime::UNIX_EPOCH
            }
        }
    }

    /// Move the watermark for `name` to `to`, never backwards.
    ///
    /// Returns the watermark now on disk.
    pub async fn advance(&self, name: &str, to: DateTime<Utc>) -> SyncResult<DateTime<Utc>> {
        let current = self.load(name).await;
        if to <= current {
            return Ok(current);
        }

        let path = self.path_for(name);
        write_atomically(&path, &to.to_rfc3339_opts(SecondsFormat::Micros, false))
            .await
            .map_err(|source| SyncError::State { path, source })?;
        Ok(to)
    }
}

async fn write_atomically(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp = path.with_extension("txt.tmp");
    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(contents.as_bytes()).await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&tmp, path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    #[test]
    fn tags_collapse_symbol_runs() {
        assert_eq!(sanitize_tag("FortiGate VPN-SSL Honeypot"), "FortiGate_VPN_SSL_Honeypot");
        assert_eq!(sanitize_tag("  --Honeypot Feed!! "), "Honeypot_Feed");
        assert_eq!(sanitize_tag("plain"), "plain");
    }

    #[tokio::test]
    async fn missing_state_reads_as_epoch() {
        let dir = TempDir::new().unwrap();
        let store = WatermarkStore::new(dir.path());

        assert_eq!(store.load("Honeypot Feed").await, DateTime::UNIX_EPOCH);
    }

    #[tokio::test]
    async fn garbage_state_reads_as_epoch() {
        let dir = TempDir::new().unwrap();
        let store = WatermarkStore::new(dir.path());

        std::fs::write(store.path_for("Honeypot Feed"), "2025-06-0").unwrap();
        assert_eq!(store.load("Honeypot Feed").await, DateTime::UNIX_EPOCH);

        std::fs::write(store.path_for("Honeypot Feed"), "").unwrap();
        assert_eq!(store.load("Honeypot Feed").await, DateTime::UNIX_EPOCH);
    }

    #[tokio::test]
    async fn reads_offset_timestamps_written_elsewhere() {
        let dir = TempDir::new().unwrap();
        let store = WatermarkStore::new(dir.path());

        std::fs::write(store.path_for("Feed"), "2025-05-28T04:26:13+00:00\n").unwrap();
        assert_eq!(
            store.load("Feed").await,
            Utc.with_ymd_and_hms(2025, 5, 28, 4, 26, 13).unwrap()
        );
    }

    #[tokio::test]
    async fn advance_round_trips_and_never_regresses() {
        let dir = TempDir::new().unwrap();
        let store = WatermarkStore::new(dir.path().join("state"));
        let t0 = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap() + Duration::microseconds(250);

        assert_eq!(store.advance("Honeypot Feed", t0).await.unwrap(), t0);
        assert_eq!(store.load("Honeypot Feed").await, t0);
        assert!(store.path_for("Honeypot Feed").ends_with("state_Honeypot_Feed.txt"));

        let earlier = t0 - Duration::hours(1);
        assert_eq!(store.advance("Honeypot Feed", earlier).await.unwrap(), t0);
        assert_eq!(store.load("Honeypot Feed").await, t0);
        assert!(!store.path_for("Honeypot Feed").with_extension("txt.tmp").exists());
    }

    #[tokio::test]
    async fn tags_are_independent() {
        let dir = TempDir::new().unwrap();
        let store = WatermarkStore::new(dir.path());
        let t0 = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();

        store.advance("Feed A", t0).await.unwrap();
        assert_eq!(store.load("Feed B").await, DateTime::UNIX_EPOCH);
    }
}
