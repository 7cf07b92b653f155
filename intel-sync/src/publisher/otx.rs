//! AlienVault OTX
//!
//! Collections are pulses. Pulse listings and indicator listings are
//! paginated; each page names the next one in `next`.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use honey_store::Indicator;
use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::http::ApiClient;
use super::{CollectionId, FeedPublisher};
use crate::config::OtxSettings;
use crate::error::PublishResult;

const AUTH_HEADER: &str = "X-OTX-API-KEY";
const PULSE_PAGE_SIZE: u32 = 50;
const INDICATOR_PAGE_SIZE: u32 = 500;
/// Stop following `next` after this many pages
const MAX_PAGES: usize = 1000;

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PulseSummary {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct RemoteIndicator {
    indicator: String,
}

#[derive(Debug, Serialize)]
struct IndicatorEntry<'a> {
    indicator: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
}

impl<'a> From<&'a Indicator> for IndicatorEntry<'a> {
    fn from(indicator: &'a Indicator) -> Self {
        Self {
            indicator: &indicator.ip,
            kind: if indicator.is_ipv6() { "IPv6" } else { "IPv4" },
        }
    }
}

#[derive(Debug, Serialize)]
struct CreatePulse<'a> {
    name: &'a str,
    description: &'a str,
    public: bool,
    tlp: &'a str,
    tags: &'a [String],
    indicators: Vec<IndicatorEntry<'a>>,
}

#[derive(Debug, Deserialize)]
struct CreatedPulse {
    id: String,
}

#[derive(Debug, Serialize)]
struct PulseUpdate<'a> {
    indicators: IndicatorChanges<'a>,
}

#[derive(Debug, Serialize)]
struct IndicatorChanges<'a> {
    add: Vec<IndicatorEntry<'a>>,
}

pub struct OtxPublisher {
    api: ApiClient,
    description: String,
    public: bool,
    tlp: String,
    tags: Vec<String>,
}

impl OtxPublisher {
    pub fn new(settings: &OtxSettings, retry_delay: Duration, timeout: Duration) -> PublishResult<Self> {
        Ok(Self {
            api: ApiClient::new(&settings.base_url, AUTH_HEADER, &settings.api_key, retry_delay, timeout)?,
            description: settings.description.clone(),
            public: settings.public,
            tlp: settings.tlp.clone(),
            tags: settings.tags.clone(),
        })
    }

    /// Collect every page starting at `first`.
    async fn fetch_all<T: serde::de::DeserializeOwned>(&self, first: String) -> PublishResult<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(first);
        let mut pages = 0;

        while let Some(url) = next.take() {
            let page: Page<T> = self.api.get_json(&url).await?;
            items.extend(page.results);
            pages += 1;

            if pages >= MAX_PAGES {
                tracing::warn!("OTX pagination stopped after {} pages at {}", pages, url);
                break;
            }
            next = page.next.filter(|n| !n.is_empty() && *n != url);
        }

        Ok(items)
    }
}

#[async_trait]
impl FeedPublisher for OtxPublisher {
    fn kind(&self) -> &'static str {
        "otx"
    }

    async fn find_collection(&self, name: &str) -> PublishResult<Option<CollectionId>> {
        let first = self
            .api
            .url(&format!("/api/v1/pulses/my?limit={PULSE_PAGE_SIZE}&page=1"));
        let pulses: Vec<PulseSummary> = self.fetch_all(first).await?;

        Ok(pulses
            .into_iter()
            .find(|pulse| pulse.name == name)
            .map(|pulse| CollectionId(pulse.id)))
    }

    async fn fetch_indicators(&self, id: &CollectionId) -> PublishResult<HashSet<String>> {
        let first = self
            .api
            .url(&format!("/api/v1/pulses/{id}/indicators?limit={INDICATOR_PAGE_SIZE}&page=1"));
        let indicators: Vec<RemoteIndicator> = self.fetch_all(first).await?;

        Ok(indicators.into_iter().map(|i| i.indicator).collect())
    }

    async fn create_collection(&self, name: &str, indicators: &[Indicator]) -> PublishResult<CollectionId> {
        let body = CreatePulse {
            name,
            description: &self.description,
            public: self.public,
            tlp: &self.tlp,
            tags: &self.tags,
            indicators: indicators.iter().map(IndicatorEntry::from).collect(),
        };

        let created: CreatedPulse = self
            .api
            .send_json(Method::POST, &self.api.url("/api/v1/pulses/create"), &body)
            .await?;
        Ok(CollectionId(created.id))
    }

    async fn add_indicator(&self, id: &CollectionId, indicator: &Indicator) -> PublishResult<()> {
        let body = PulseUpdate {
            indicators: IndicatorChanges {
                add: vec![IndicatorEntry::from(indicator)],
            },
        };

        self.api
            .send(Method::PATCH, &self.api.url(&format!("/api/v1/pulses/{id}")), &body)
            .await
    }
}
