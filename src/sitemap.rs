//! Sitemap enumeration: which URLs exist and when each was last modified.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use quick_xml::de::from_str;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapEntry {
    pub loc: String,
    pub last_modified: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait SitemapSource: Send + Sync {
    async fn list_urls(&self) -> Result<Vec<SitemapEntry>>;
}

#[derive(Debug, Deserialize)]
struct UrlSet {
    #[serde(rename = "url", default)]
    url: Vec<UrlItem>,
}

#[derive(Debug, Deserialize)]
struct UrlItem {
    loc: String,
    lastmod: Option<String>,
}

/// W3C datetime as used in sitemaps: full RFC 3339 or a bare date (midnight UTC).
pub fn parse_lastmod(ts: &str) -> Option<DateTime<Utc>> {
    let ts = ts.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(ts, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

pub fn parse_sitemap(xml: &str) -> Result<Vec<SitemapEntry>> {
    let set: UrlSet = from_str(xml).context("parsing sitemap xml")?;
    Ok(set
        .url
        .into_iter()
        .map(|u| SitemapEntry {
            loc: u.loc.trim().to_string(),
            last_modified: u.lastmod.as_deref().and_then(parse_lastmod),
        })
        .filter(|e| !e.loc.is_empty())
        .collect())
}

pub struct Sitemap {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl Sitemap {
    pub fn from_fixture_str(xml: &str) -> Self {
        Self {
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    pub fn from_url(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            mode: Mode::Http {
                url: url.into(),
                client,
            },
        }
    }
}

#[async_trait]
impl SitemapSource for Sitemap {
    async fn list_urls(&self) -> Result<Vec<SitemapEntry>> {
        match &self.mode {
            Mode::Fixture(xml) => parse_sitemap(xml),
            Mode::Http { url, client } => {
                let body = client
                    .get(url.as_str())
                    .send()
                    .await
                    .with_context(|| format!("get {url}"))?
                    .error_for_status()
                    .with_context(|| format!("get {url}"))?
                    .text()
                    .await
                    .context("sitemap .text()")?;
                let entries = parse_sitemap(&body).with_context(|| format!("parse {url}"))?;
                tracing::info!(target: "sitemap", %url, urls = entries.len(), "sitemap fetched");
                Ok(entries)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn lastmod_formats() {
        assert_eq!(
            parse_lastmod("2023-04-05T10:00:00+09:00"),
            Some(Utc.with_ymd_and_hms(2023, 4, 5, 1, 0, 0).unwrap())
        );
        assert_eq!(
            parse_lastmod("2023-04-05"),
            Some(Utc.with_ymd_and_hms(2023, 4, 5, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_lastmod("yesterday"), None);
    }

    #[test]
    fn parses_urlset_with_and_without_lastmod() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://x/</loc><lastmod>2023-01-01T00:00:00Z</lastmod></url>
  <url><loc> https://x/articles/a/ </loc></url>
</urlset>"#;
        let v = parse_sitemap(xml).unwrap();
        assert_eq!(v.len(), 2);
        assert!(v[0].last_modified.is_some());
        assert_eq!(v[1].loc, "https://x/articles/a/");
        assert_eq!(v[1].last_modified, None);
    }
}
