use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::{ShareCountFetcher, Transport};
use crate::cache::ProviderId;

pub const FACEBOOK_ENDPOINT: &str = "https://graph.facebook.com/v10.0/";
const ENV_TOKEN: &str = "FB_TOKEN";

#[derive(Debug, Deserialize)]
struct GraphResponse {
    og_object: Option<OgObject>,
}

#[derive(Debug, Deserialize)]
struct OgObject {
    engagement: Option<Engagement>,
}

#[derive(Debug, Deserialize)]
struct Engagement {
    #[serde(default)]
    count: u64,
}

/// Facebook Graph engagement count for the URL's Open Graph object.
pub struct FacebookFetcher {
    transport: Transport,
    access_token: String,
}

impl FacebookFetcher {
    pub fn from_fixture(body: &str) -> Self {
        Self {
            transport: Transport::Fixture(body.to_string()),
            access_token: String::new(),
        }
    }

    pub fn new(client: reqwest::Client, access_token: String) -> Result<Self> {
        Ok(Self {
            transport: Transport::http(FACEBOOK_ENDPOINT, client)?,
            access_token,
        })
    }

    /// Live fetcher using the `FB_TOKEN` access token.
    pub fn from_env(client: reqwest::Client) -> Result<Self> {
        let token = std::env::var(ENV_TOKEN)
            .map_err(|_| anyhow!("Missing {ENV_TOKEN} env var (or disable facebook)"))?;
        Self::new(client, token)
    }
}

/// Engagement count; a URL Facebook has never seen has no object and counts 0.
pub fn parse_engagement(body: &str) -> Result<u64> {
    let r: GraphResponse =
        serde_json::from_str(body).context("facebook response unmarshal json")?;
    Ok(r.og_object
        .and_then(|o| o.engagement)
        .map(|e| e.count)
        .unwrap_or(0))
}

#[async_trait]
impl ShareCountFetcher for FacebookFetcher {
    fn provider(&self) -> ProviderId {
        ProviderId::Facebook
    }

    async fn fetch(&self, url: &str) -> Result<u64> {
        let query = [
            ("fields", "og_object{engagement}"),
            ("id", url),
            ("access_token", self.access_token.as_str()),
        ];
        let body = self.transport.get(self.provider(), &query).await?;
        tracing::debug!(target: "providers", provider = "facebook", %url, body = %body, "graph response");
        parse_engagement(&body)
    }
}
