//! Feed publishers
//!
//! Every threat-intel destination is reached through [`FeedPublisher`],
//! a create-or-update view of one named collection of indicators. The
//! sync pipeline only ever talks to this trait.

pub mod http;
pub mod otx;
pub mod virustotal;

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use honey_store::Indicator;

use crate::config::Destination;
use crate::error::PublishResult;

pub use otx::OtxPublisher;
pub use virustotal::VirusTotalPublisher;

/// Destination-side identifier of a collection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionId(pub String);

impl std::fmt::Display for CollectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
pub trait FeedPublisher: Send + Sync {
    /// Short destination kind, for logs
    fn kind(&self) -> &'static str;

    /// Id of the collection named exactly `name`, if it exists.
    async fn find_collection(&self, name: &str) -> PublishResult<Option<CollectionId>>;

    /// Indicator values already held by the collection.
    async fn fetch_indicators(&self, id: &CollectionId) -> PublishResult<HashSet<String>>;

    /// Create the collection in one call carrying all of `indicators`.
    async fn create_collection(&self, name: &str, indicators: &[Indicator]) -> PublishResult<CollectionId>;

    /// Add one indicator to an existing collection.
    async fn add_indicator(&self, id: &CollectionId, indicator: &Indicator) -> PublishResult<()>;
}

/// Build the publisher for a configured destination.
pub fn from_config(
    destination: &Destination,
    retry_delay: Duration,
    timeout: Duration,
) -> PublishResult<Box<dyn FeedPublisher>> {
    let publisher: Box<dyn FeedPublisher> = match destination {
        Destination::Otx(settings) => Box::new(OtxPublisher::new(settings, retry_delay, timeout)?),
        Destination::VirusTotal(settings) => Box::new(VirusTotalPublisher::new(settings, retry_delay, timeout)?),
    };
    Ok(publisher)
}
