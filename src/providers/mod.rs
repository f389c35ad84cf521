//! Per-provider share-count fetchers.
//!
//! Every fetcher can run against a fixed response body (tests, replays) or a
//! live HTTP endpoint. Parsing is kept separate from transport so response
//! handling is testable without a network.

pub mod facebook;
pub mod feedly;
pub mod hatebu;
pub mod pocket;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::cache::ProviderId;

pub use facebook::FacebookFetcher;
pub use feedly::FeedlyFetcher;
pub use hatebu::HatebuFetcher;
pub use pocket::PocketFetcher;

/// Fetches one provider's count for a URL. An error aborts the URL (or the run).
#[async_trait]
pub trait ShareCountFetcher: Send + Sync {
    fn provider(&self) -> ProviderId;
    async fn fetch(&self, url: &str) -> Result<u64>;
}

pub(crate) enum Transport {
    Fixture(String),
    Http {
        endpoint: reqwest::Url,
        client: reqwest::Client,
    },
}

impl Transport {
    pub(crate) fn http(endpoint: &str, client: reqwest::Client) -> Result<Self> {
        let endpoint = reqwest::Url::parse(endpoint)
            .with_context(|| format!("invalid endpoint {endpoint}"))?;
        Ok(Self::Http { endpoint, client })
    }

    /// GET the endpoint with `query` and return the body text.
    pub(crate) async fn get(&self, provider: ProviderId, query: &[(&str, &str)]) -> Result<String> {
        match self {
            Transport::Fixture(body) => Ok(body.clone()),
            Transport::Http { endpoint, client } => {
                let resp = client
                    .get(endpoint.clone())
                    .query(query)
                    .send()
                    .await
                    .inspect_err(|e| {
                        tracing::warn!(error = ?e, provider = provider.as_str(), "provider http error");
                    })
                    .with_context(|| format!("{provider} http get"))?;
                resp.error_for_status()
                    .with_context(|| format!("{provider} non-2xx"))?
                    .text()
                    .await
                    .with_context(|| format!("{provider} response body"))
            }
        }
    }
}
