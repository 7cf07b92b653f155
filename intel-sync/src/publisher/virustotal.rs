//! VirusTotal
//!
//! Reputation-style destination: there is no listable collection, only
//! per-address votes and comments. The "collection" is the account's own
//! reputation stream. It always exists, reads back empty, and adding an
//! indicator means a malicious vote followed by a comment.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::SecondsFormat;
use honey_store::Indicator;
use reqwest::Method;
use serde_json::json;

use super::http::ApiClient;
use super::{CollectionId, FeedPublisher};
use crate::config::VirusTotalSettings;
use crate::error::PublishResult;

const AUTH_HEADER: &str = "x-apikey";

pub struct VirusTotalPublisher {
    api: ApiClient,
    comment_template: String,
}

impl VirusTotalPublisher {
    pub fn new(settings: &VirusTotalSettings, retry_delay: Duration, timeout: Duration) -> PublishResult<Self> {
        Ok(Self {
            api: ApiClient::new(&settings.base_url, AUTH_HEADER, &settings.api_key, retry_delay, timeout)?,
            comment_template: settings.comment.clone(),
        })
    }

    /// Fill `{ip}` and `{seen}` in the comment template.
    pub fn comment_for(&self, indicator: &Indicator) -> String {
        self.comment_template
            .replace("{ip}", &indicator.ip)
            .replace("{seen}", &indicator.first_seen.to_rfc3339_opts(SecondsFormat::Secs, false))
    }

    async fn vote_malicious(&self, ip: &str) -> PublishResult<()> {
        let body = json!({"data": {"type": "vote", "attributes": {"verdict": "malicious"}}});
        self.api
            .send(Method::POST, &self.api.url(&format!("/api/v3/ip_addresses/{ip}/votes")), &body)
            .await
    }

    async fn comment(&self, ip: &str, text: &str) -> PublishResult<()> {
        let body = json!({"data": {"type": "comment", "attributes": {"text": text}}});
        self.api
            .send(Method::POST, &self.api.url(&format!("/api/v3/ip_addresses/{ip}/comments")), &body)
            .await
    }
}

#[async_trait]
impl FeedPublisher for VirusTotalPublisher {
    fn kind(&self) -> &'static str {
        "virustotal"
    }

    async fn find_collection(&self, name: &str) -> PublishResult<Option<CollectionId>> {
        Ok(Some(CollectionId(name.to_string())))
    }

    async fn fetch_indicators(&self, _id: &CollectionId) -> PublishResult<HashSet<String>> {
        Ok(HashSet::new())
    }

    /// Report every indicator in turn, stopping at the first failure.
    async fn create_collection(&self, name: &str, indicators: &[Indicator]) -> PublishResult<CollectionId> {
        let id = CollectionId(name.to_string());
        for indicator in indicators {
            self.add_indicator(&id, indicator).await?;
        }
        Ok(id)
    }

    async fn add_indicator(&self, _id: &CollectionId, indicator: &Indicator) -> PublishResult<()> {
        self.vote_malicious(&indicator.ip).await?;
        self.comment(&indicator.ip, &self.comment_for(indicator)).await
    }
}
