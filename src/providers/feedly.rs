use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::{ShareCountFetcher, Transport};
use crate::cache::ProviderId;

pub const FEEDLY_FEEDS_ENDPOINT: &str = "https://cloud.feedly.com/v3/feeds";

#[derive(Debug, Deserialize)]
struct FeedResponse {
    #[serde(default)]
    subscribers: u64,
}

/// Feedly subscriber count of the site feed. The URL argument is not used.
pub struct FeedlyFetcher {
    transport: Transport,
}

impl FeedlyFetcher {
    pub fn from_fixture(body: &str) -> Self {
        Self {
            transport: Transport::Fixture(body.to_string()),
        }
    }

    /// `feed_id` looks like `feed/https://example.com/atom.xml`.
    pub fn new(client: reqwest::Client, feed_id: &str) -> Result<Self> {
        let mut url = reqwest::Url::parse(FEEDLY_FEEDS_ENDPOINT)?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("feedly endpoint cannot be a base"))?
            .pop_if_empty()
            .push(feed_id);
        Ok(Self {
            transport: Transport::http(url.as_str(), client)?,
        })
    }
}

pub fn parse_subscribers(body: &str) -> Result<u64> {
    let r: FeedResponse = serde_json::from_str(body).context("unmarshal feedly response")?;
    Ok(r.subscribers)
}

#[async_trait]
impl ShareCountFetcher for FeedlyFetcher {
    fn provider(&self) -> ProviderId {
        ProviderId::Feedly
    }

    async fn fetch(&self, _url: &str) -> Result<u64> {
        let body = self.transport.get(self.provider(), &[]).await?;
        parse_subscribers(&body)
    }
}
