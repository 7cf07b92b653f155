//! Sync pipeline
//!
//! One run per destination, strictly in order:
//!
//! ```text
//! load watermark ─▶ select indicators ─▶ find collection ─┬─ absent ──▶ create with all
//!                                                          └─ present ─▶ fetch, add missing one by one
//!                                                                          │
//!                                        advance watermark ◀──────────────┘
//! ```
//!
//! Lookup, fetch and create failures abort before the watermark moves, so
//! the same indicators are offered again next run. A single add that
//! still fails after its retry is skipped and the run carries on.
//!
//! The watermark advances to the newest `first_seen` among everything
//! selected, skipped indicators included, so a skipped indicator is not
//! offered again unless the destination is reset.
//!
//! Sources first seen within the last [`SETTLE_DELAY`] are left for the
//! next run. The portal stamps an attempt before its insert commits, so a
//! younger row could still land behind a freshly written watermark.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use honey_store::Indicator;
use serde::Serialize;
use sqlx::SqlitePool;
use tokio::sync::watch;

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::publisher::{self, FeedPublisher};
use crate::state::WatermarkStore;

/// Longer than the store's busy timeout, so every attempt stamped before
/// `now - SETTLE_DELAY` has committed by the time it is read.
pub const SETTLE_DELAY: Duration = Duration::seconds(30);

/// What one destination run did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    pub destination: String,
    pub selected: usize,
    pub already_present: usize,
    pub submitted: usize,
    pub skipped: usize,
    pub created: bool,
    pub watermark: DateTime<Utc>,
}

/// Lower bound for selection: the watermark, or the recency cutoff if
/// that is more recent.
pub fn selection_floor(watermark: DateTime<Utc>, recency: Option<Duration>, now: DateTime<Utc>) -> DateTime<Utc> {
    match recency {
        Some(window) => watermark.max(now - window),
        None => watermark,
    }
}

fn check_shutdown(shutdown: &watch::Receiver<bool>) -> SyncResult<()> {
    if *shutdown.borrow() {
        return Err(SyncError::Interrupted);
    }
    Ok(())
}

/// Reconcile newly seen source addresses with one destination collection.
pub async fn sync_destination(
    pool: &SqlitePool,
    publisher: &dyn FeedPublisher,
    state: &WatermarkStore,
    name: &str,
    recency: Option<Duration>,
    shutdown: &watch::Receiver<bool>,
) -> SyncResult<SyncOutcome> {
    let watermark = state.load(name).await;
    let now = Utc::now();
    let floor = selection_floor(watermark, recency, now);
    let selected = Indicator::first_seen_between(pool, floor, now - SETTLE_DELAY).await?;

    let mut outcome = SyncOutcome {
        destination: name.to_string(),
        selected: selected.len(),
        already_present: 0,
        submitted: 0,
        skipped: 0,
        created: false,
        watermark,
    };

    let Some(newest) = selected.iter().map(|i| i.first_seen).max() else {
        tracing::info!("[{}] {}: no new indicators since {}", publisher.kind(), name, floor);
        return Ok(outcome);
    };

    check_shutdown(shutdown)?;
    let existing_id = publisher
        .find_collection(name)
        .await
        .map_err(SyncError::publish("collection lookup"))?;

    check_shutdown(shutdown)?;
    match existing_id {
        None => {
            tracing::info!(
                "[{}] {}: collection not found, creating with {} indicators",
                publisher.kind(),
                name,
                selected.len()
            );
            let id = publisher
                .create_collection(name, &selected)
                .await
                .map_err(SyncError::publish("collection create"))?;
            tracing::info!("[{}] {}: created collection {}", publisher.kind(), name, id);

            outcome.created = true;
            outcome.submitted = selected.len();
        }
        Some(id) => {
            let existing: HashSet<String> = publisher
                .fetch_indicators(&id)
                .await
                .map_err(SyncError::publish("indicator fetch"))?;

            for indicator in &selected {
                if existing.contains(&indicator.ip) {
                    outcome.already_present += 1;
                    continue;
                }

                check_shutdown(shutdown)?;
                match publisher.add_indicator(&id, indicator).await {
                    Ok(()) => {
                        tracing::debug!("[{}] {}: added {}", publisher.kind(), name, indicator.ip);
                        outcome.submitted += 1;
                    }
                    Err(e) => {
                        tracing::warn!("[{}] {}: skipping {}: {}", publisher.kind(), name, indicator.ip, e);
                        outcome.skipped += 1;
                    }
                }
            }
        }
    }

    check_shutdown(shutdown)?;
    outcome.watermark = state.advance(name, newest).await?;

    tracing::info!(
        "[{}] {}: selected={} present={} submitted={} skipped={} watermark={}",
        publisher.kind(),
        name,
        outcome.selected,
        outcome.already_present,
        outcome.submitted,
        outcome.skipped,
        outcome.watermark
    );
    Ok(outcome)
}

/// Run every configured destination (or just `only`) concurrently.
///
/// Results come back in configuration order, one per destination.
pub async fn run_all(
    config: &SyncConfig,
    pool: &SqlitePool,
    only: Option<&str>,
    shutdown: watch::Receiver<bool>,
) -> Vec<(String, SyncResult<SyncOutcome>)> {
    let mut tasks = Vec::new();
    let mut results = Vec::new();

    for destination in &config.destinations {
        if only.is_some_and(|only| only != destination.name()) {
            continue;
        }

        let label = format!("{} {}", destination.kind(), destination.name());
        let publisher = match publisher::from_config(destination, config.retry_delay(), config.timeout()) {
            Ok(publisher) => publisher,
            Err(e) => {
                results.push((label, Err(SyncError::publish("client setup")(e))));
                continue;
            }
        };

        let pool = pool.clone();
        let state = WatermarkStore::new(config.state_dir_for(destination));
        let name = destination.name().to_string();
        let recency = destination.recency();
        let shutdown = shutdown.clone();

        let handle = tokio::spawn(async move {
            sync_destination(&pool, publisher.as_ref(), &state, &name, recency, &shutdown).await
        });
        tasks.push((label, handle));
    }

    for (label, handle) in tasks {
        match handle.await {
            Ok(result) => results.push((label, result)),
            Err(e) => tracing::error!("{}: sync task panicked: {}", label, e),
        }
    }

    results
}
