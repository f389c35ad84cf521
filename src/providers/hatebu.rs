use anyhow::{Context, Result};
use async_trait::async_trait;

use super::{ShareCountFetcher, Transport};
use crate::cache::ProviderId;

pub const HATEBU_ENDPOINT: &str = "https://bookmark.hatenaapis.com/count/entry";

/// Hatena Bookmark count. The endpoint answers with a bare integer.
pub struct HatebuFetcher {
    transport: Transport,
}

impl HatebuFetcher {
    pub fn from_fixture(body: &str) -> Self {
        Self {
            transport: Transport::Fixture(body.to_string()),
        }
    }

    pub fn from_client(client: reqwest::Client) -> Result<Self> {
        Self::with_endpoint(HATEBU_ENDPOINT, client)
    }

    /// Live fetcher against a non-default endpoint (mirrors, local stubs).
    pub fn with_endpoint(endpoint: &str, client: reqwest::Client) -> Result<Self> {
        Ok(Self {
            transport: Transport::http(endpoint, client)?,
        })
    }
}

pub fn parse_count(body: &str) -> Result<u64> {
    body.trim()
        .parse::<u64>()
        .with_context(|| format!("hatebu response is invalid: {:?}", body.trim()))
}

#[async_trait]
impl ShareCountFetcher for HatebuFetcher {
    fn provider(&self) -> ProviderId {
        ProviderId::Hatebu
    }

    async fn fetch(&self, url: &str) -> Result<u64> {
        let body = self.transport.get(self.provider(), &[("url", url)]).await?;
        parse_count(&body)
    }
}
