use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::{ShareCountFetcher, Transport};
use crate::cache::ProviderId;

pub const POCKET_ENDPOINT: &str = "https://widgets.getpocket.com/api/saves";

#[derive(Debug, Deserialize)]
struct PocketResponse {
    #[serde(default)]
    saves: u64,
}

/// Pocket save count.
pub struct PocketFetcher {
    transport: Transport,
}

impl PocketFetcher {
    pub fn from_fixture(body: &str) -> Self {
        Self {
            transport: Transport::Fixture(body.to_string()),
        }
    }

    pub fn from_client(client: reqwest::Client) -> Result<Self> {
        Ok(Self {
            transport: Transport::http(POCKET_ENDPOINT, client)?,
        })
    }
}

pub fn parse_saves(body: &str) -> Result<u64> {
    let r: PocketResponse =
        serde_json::from_str(body).context("pocket response unmarshal json")?;
    Ok(r.saves)
}

#[async_trait]
impl ShareCountFetcher for PocketFetcher {
    fn provider(&self) -> ProviderId {
        ProviderId::Pocket
    }

    async fn fetch(&self, url: &str) -> Result<u64> {
        let body = self.transport.get(self.provider(), &[("url", url)]).await?;
        parse_saves(&body)
    }
}
