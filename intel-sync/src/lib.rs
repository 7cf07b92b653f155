//! Honeypot intel sync
//!
//! Batch jobs that read the attempt store written by the portal decoy:
//!
//! - `sync` publishes newly seen source addresses to each configured
//!   threat-intel destination, tracking a watermark per destination
//! - `report` prints the aggregation views as JSON for the email job
//!
//! Neither job shares memory with the portal process; the SQLite store is
//! the only interface between them.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod publisher;
pub mod report;
pub mod state;

pub use config::{Destination, SyncConfig};
pub use error::{ConfigError, PublishError, SyncError};
pub use pipeline::{run_all, sync_destination, SyncOutcome};
pub use publisher::{CollectionId, FeedPublisher};
pub use state::WatermarkStore;
