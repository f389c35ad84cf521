//! Analytics report source: raw `(path, title) -> pageviews` rows.
//!
//! Speaks the GA4 Data API `runReport` shape. The live client takes a ready
//! bearer token from `GA_ACCESS_TOKEN`; obtaining that token is left to the
//! caller (e.g. `gcloud auth print-access-token`).

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const RUN_REPORT_ENDPOINT: &str = "https://analyticsdata.googleapis.com/v1beta";
const ENV_TOKEN: &str = "GA_ACCESS_TOKEN";

pub const DIM_PATH: &str = "pagePath";
pub const DIM_TITLE: &str = "pageTitle";
pub const METRIC_PAGEVIEWS: &str = "screenPageViews";

/// Report parameters. Dimensions and metric are fixed to path/title/pageviews.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub start_date: String,
    pub end_date: String,
    pub limit: u32,
}

impl ReportRequest {
    fn to_body(&self) -> serde_json::Value {
        serde_json::json!({
            "dateRanges": [{ "startDate": self.start_date, "endDate": self.end_date }],
            "dimensions": [{ "name": DIM_PATH }, { "name": DIM_TITLE }],
            "metrics": [{ "name": METRIC_PAGEVIEWS }],
            "orderBys": [{ "desc": true, "metric": { "metricName": METRIC_PAGEVIEWS } }],
            "limit": self.limit.to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    #[serde(default)]
    pub value: String,
}

/// One report row: `dimensionValues = [path, title]`, `metricValues = [pageviews]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRow {
    #[serde(default)]
    pub dimension_values: Vec<Cell>,
    #[serde(default)]
    pub metric_values: Vec<Cell>,
}

impl RawRow {
    pub fn new(path: &str, title: &str, pageviews: &str) -> Self {
        Self {
            dimension_values: vec![
                Cell { value: path.into() },
                Cell { value: title.into() },
            ],
            metric_values: vec![Cell {
                value: pageviews.into(),
            }],
        }
    }

    fn cell(cells: &[Cell], i: usize) -> &str {
        cells.get(i).map(|c| c.value.as_str()).unwrap_or_default()
    }

    pub fn path(&self) -> &str {
        Self::cell(&self.dimension_values, 0)
    }

    pub fn title(&self) -> &str {
        Self::cell(&self.dimension_values, 1)
    }

    pub fn pageviews(&self) -> &str {
        Self::cell(&self.metric_values, 0)
    }
}

#[derive(Debug, Deserialize)]
struct RunReportResponse {
    #[serde(default)]
    rows: Vec<RawRow>,
}

pub fn parse_report(body: &str) -> Result<Vec<RawRow>> {
    let resp: RunReportResponse = serde_json::from_str(body).context("parse runReport json")?;
    Ok(resp.rows)
}

#[async_trait]
pub trait AnalyticsSource: Send + Sync {
    async fn run_report(&self, req: &ReportRequest) -> Result<Vec<RawRow>>;
}

/// Live GA4 Data API client.
pub struct Ga4Client {
    property_id: String,
    access_token: String,
    client: reqwest::Client,
}

impl Ga4Client {
    pub fn new(client: reqwest::Client, property_id: String, access_token: String) -> Self {
        Self {
            property_id,
            access_token,
            client,
        }
    }

    pub fn from_env(client: reqwest::Client, property_id: String) -> Result<Self> {
        let token = std::env::var(ENV_TOKEN)
            .map_err(|_| anyhow!("Missing {ENV_TOKEN} env var (or pass --report-file)"))?;
        Ok(Self::new(client, property_id, token))
    }

    fn endpoint(&self) -> String {
        format!(
            "{RUN_REPORT_ENDPOINT}/properties/{}:runReport",
            self.property_id
        )
    }
}

#[async_trait]
impl AnalyticsSource for Ga4Client {
    async fn run_report(&self, req: &ReportRequest) -> Result<Vec<RawRow>> {
        let url = self.endpoint();
        let body = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&req.to_body())
            .send()
            .await
            .context("reporting run report")?
            .error_for_status()
            .context("reporting non-2xx")?
            .text()
            .await
            .context("reporting response body")?;
        let rows = parse_report(&body)?;
        tracing::info!(target: "analytics", property = %self.property_id, rows = rows.len(), "report fetched");
        Ok(rows)
    }
}

/// A previously saved `runReport` response; the request is ignored.
pub struct SavedReport {
    body: String,
}

impl SavedReport {
    pub fn from_json_str(body: &str) -> Self {
        Self {
            body: body.to_string(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let body = std::fs::read_to_string(path)
            .with_context(|| format!("reading report from {}", path.display()))?;
        Ok(Self { body })
    }
}

#[async_trait]
impl AnalyticsSource for SavedReport {
    async fn run_report(&self, _req: &ReportRequest) -> Result<Vec<RawRow>> {
        parse_report(&self.body)
    }
}
