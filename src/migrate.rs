//! One-off migration from the legacy per-provider caches
//! (`cache_<provider>.json`, each a `{url: count}` map) to the share-count cache.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use crate::cache::{reconcile, ProviderId, ShareCountRecord};
use crate::output::sort_by_url_desc;

pub const LEGACY_PROVIDERS: [ProviderId; 4] = [
    ProviderId::Facebook,
    ProviderId::Hatebu,
    ProviderId::Pocket,
    ProviderId::Twitter,
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyMaps {
    pub counts: BTreeMap<ProviderId, HashMap<String, u64>>,
}

impl LegacyMaps {
    /// Read `cache_facebook.json`, `cache_hatebu.json`, `cache_pocket.json`
    /// and `cache_twitter.json` from `dir`. All four must exist.
    pub fn load(dir: &Path) -> Result<Self> {
        let mut counts = BTreeMap::new();
        for p in LEGACY_PROVIDERS {
            let path = dir.join(format!("cache_{}.json", p.as_str()));
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let map: HashMap<String, u64> = serde_json::from_str(&raw)
                .with_context(|| format!("parsing {}", path.display()))?;
            tracing::info!(target: "migrate", provider = p.as_str(), urls = map.len(), "legacy cache read");
            counts.insert(p, map);
        }
        Ok(Self { counts })
    }
}

/// One record per URL seen in any legacy map; every slot is stamped `now`.
/// A URL missing from one provider's map gets 0 for that provider.
pub fn build_from_legacy(maps: &LegacyMaps, now: DateTime<Utc>) -> Vec<ShareCountRecord> {
    let urls: BTreeSet<&String> = maps.counts.values().flat_map(|m| m.keys()).collect();

    let records = urls
        .into_iter()
        .map(|url| {
            let fresh: BTreeMap<ProviderId, u64> = LEGACY_PROVIDERS
                .iter()
                .map(|p| {
                    let count = maps
                        .counts
                        .get(p)
                        .and_then(|m| m.get(url))
                        .copied()
                        .unwrap_or(0);
                    (*p, count)
                })
                .collect();
            reconcile(None, url, &fresh, now)
        })
        .collect();

    sort_by_url_desc(records)
}
