//! # Share-count refresh run
//! One pass over a sitemap snapshot: decide what is stale, fetch it, reconcile
//! each URL once into the cache, and hand back the full cache in output order.
//!
//! Fetches are issued one at a time in sitemap order. Nothing is emitted until
//! the whole pass finished, so an aborted run never produces partial output.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use metrics::counter;
use std::collections::{BTreeMap, HashSet};

use crate::cache::{CacheStore, ProviderId, ShareCountRecord};
use crate::config::FetchErrorPolicy;
use crate::providers::ShareCountFetcher;
use crate::sitemap::SitemapSource;
use crate::staleness::StalenessPolicy;
use crate::telemetry::ensure_metrics_described;

#[derive(Debug, Clone)]
pub struct RefreshSettings {
    pub policy: StalenessPolicy,
    /// URL whose record carries the site-wide subscriber count.
    pub site_root: String,
    pub on_fetch_error: FetchErrorPolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub sitemap_urls: usize,
    pub reconciled: usize,
    pub fetches: usize,
    pub frozen: usize,
    pub duplicates: usize,
    pub failed_urls: Vec<String>,
}

/// Refresh `store` against the sitemap and return every cached record sorted
/// by URL descending. Records for URLs absent from the sitemap pass through.
pub async fn refresh_share_counts(
    mut store: CacheStore,
    sitemap: &dyn SitemapSource,
    fetchers: &[Box<dyn ShareCountFetcher>],
    settings: &RefreshSettings,
    now: DateTime<Utc>,
) -> Result<(Vec<ShareCountRecord>, RunSummary)> {
    ensure_metrics_described();

    let mut by_provider: BTreeMap<ProviderId, &dyn ShareCountFetcher> = BTreeMap::new();
    for f in fetchers {
        if by_provider.insert(f.provider(), f.as_ref()).is_some() {
            bail!("more than one fetcher configured for {}", f.provider());
        }
    }
    let available: Vec<ProviderId> = by_provider.keys().copied().collect();

    let entries = sitemap.list_urls().await?;
    let mut summary = RunSummary {
        sitemap_urls: entries.len(),
        ..RunSummary::default()
    };
    let mut seen: HashSet<&str> = HashSet::with_capacity(entries.len());

    'urls: for entry in &entries {
        let url = entry.loc.as_str();
        if !seen.insert(url) {
            tracing::warn!(target: "share_count", %url, "duplicate sitemap entry ignored");
            counter!("sharecount_skipped_total", "reason" => "duplicate").increment(1);
            summary.duplicates += 1;
            continue;
        }

        let is_root = url == settings.site_root;
        let in_window = settings.policy.in_window(entry.last_modified, now);
        let due = settings.policy.due_providers(
            store.get(url),
            entry.last_modified,
            is_root,
            &available,
            now,
        );

        if !in_window && due.is_empty() {
            counter!("sharecount_skipped_total", "reason" => "frozen").increment(1);
            summary.frozen += 1;
            continue;
        }

        let mut fresh: BTreeMap<ProviderId, u64> = BTreeMap::new();
        for provider in due {
            let Some(fetcher) = by_provider.get(&provider) else {
                continue;
            };
            match fetcher.fetch(url).await {
                Ok(count) => {
                    counter!("sharecount_fetch_total", "provider" => provider.as_str())
                        .increment(1);
                    summary.fetches += 1;
                    fresh.insert(provider, count);
                }
                Err(e) => {
                    counter!("sharecount_fetch_errors_total", "provider" => provider.as_str())
                        .increment(1);
                    match settings.on_fetch_error {
                        FetchErrorPolicy::Abort => {
                            return Err(e.context(format!("{provider} fetch for {url}")));
                        }
                        FetchErrorPolicy::SkipUrl => {
                            tracing::warn!(target: "share_count", error = ?e, provider = provider.as_str(), %url, "fetch failed, url left unchanged");
                            summary.failed_urls.push(url.to_string());
                            continue 'urls;
                        }
                    }
                }
            }
        }

        tracing::debug!(target: "share_count", %url, refreshed = fresh.len(), "reconcile");
        store.apply(url, &fresh, now)?;
        summary.reconciled += 1;
    }

    tracing::info!(
        target: "share_count",
        urls = summary.sitemap_urls,
        reconciled = summary.reconciled,
        fetches = summary.fetches,
        frozen = summary.frozen,
        failed = summary.failed_urls.len(),
        "share-count run finished"
    );

    Ok((store.into_sorted(), summary))
}
