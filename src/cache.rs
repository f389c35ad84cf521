//! # Share-count cache
//! Long-lived per-URL share counts, one slot per provider.
//!
//! The on-disk blob is a JSON array of [`ShareCountRecord`]. Field names follow
//! the format downstream consumers already read (`URL`, `FaceBook`, `FetchAt`, ...).
//! A slot that was never fetched is written with the zero timestamp
//! `0001-01-01T00:00:00Z` and read back as "not fetched".

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Share-count providers tracked per URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Twitter,
    Facebook,
    Hatebu,
    Pocket,
    Feedly,
}

impl ProviderId {
    pub const ALL: [ProviderId; 5] = [
        ProviderId::Twitter,
        ProviderId::Facebook,
        ProviderId::Hatebu,
        ProviderId::Pocket,
        ProviderId::Feedly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Twitter => "twitter",
            ProviderId::Facebook => "facebook",
            ProviderId::Hatebu => "hatebu",
            ProviderId::Pocket => "pocket",
            ProviderId::Feedly => "feedly",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let t = s.trim();
        ProviderId::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(t))
            .ok_or_else(|| anyhow::anyhow!("unknown provider: {t:?}"))
    }
}

/// One provider slot: the last count and when it was fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShareCount {
    #[serde(rename = "Count")]
    pub count: u64,
    #[serde(rename = "FetchAt", default, with = "fetch_at")]
    pub fetched_at: Option<DateTime<Utc>>,
}

impl ShareCount {
    pub fn fetched(count: u64, at: DateTime<Utc>) -> Self {
        Self {
            count,
            fetched_at: Some(at),
        }
    }
}

/// Cached share counts for one canonical URL.
///
/// `feedly` is `None` when the provider does not apply to this URL (only the
/// site root carries a subscriber count). `Some` with `fetched_at: None` means
/// it applies but has not been fetched yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareCountRecord {
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "Twitter", default)]
    pub twitter: ShareCount,
    #[serde(rename = "FaceBook", default)]
    pub facebook: ShareCount,
    #[serde(rename = "Hatebu", default)]
    pub hatebu: ShareCount,
    #[serde(rename = "Pocket", default)]
    pub pocket: ShareCount,
    #[serde(rename = "Feedly", default, skip_serializing_if = "Option::is_none")]
    pub feedly: Option<ShareCount>,
}

impl ShareCountRecord {
    /// Fresh record with zero counts for every article provider.
    pub fn empty(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            twitter: ShareCount::default(),
            facebook: ShareCount::default(),
            hatebu: ShareCount::default(),
            pocket: ShareCount::default(),
            feedly: None,
        }
    }

    /// Slot for `provider`, or `None` if the provider does not apply to this URL.
    pub fn slot(&self, provider: ProviderId) -> Option<&ShareCount> {
        match provider {
            ProviderId::Twitter => Some(&self.twitter),
            ProviderId::Facebook => Some(&self.facebook),
            ProviderId::Hatebu => Some(&self.hatebu),
            ProviderId::Pocket => Some(&self.pocket),
            ProviderId::Feedly => self.feedly.as_ref(),
        }
    }

    fn set_slot(&mut self, provider: ProviderId, value: ShareCount) {
        match provider {
            ProviderId::Twitter => self.twitter = value,
            ProviderId::Facebook => self.facebook = value,
            ProviderId::Hatebu => self.hatebu = value,
            ProviderId::Pocket => self.pocket = value,
            ProviderId::Feedly => self.feedly = Some(value),
        }
    }

    /// Last fetch time for `provider`; `None` if never fetched or not applicable.
    pub fn fetched_at(&self, provider: ProviderId) -> Option<DateTime<Utc>> {
        self.slot(provider).and_then(|s| s.fetched_at)
    }
}

impl crate::output::UrlKeyed for ShareCountRecord {
    fn url_key(&self) -> &str {
        &self.url
    }
}

/// Merge freshly fetched counts into an existing record.
///
/// Providers present in `fresh` get their count replaced and `fetched_at = now`;
/// every other slot is carried over untouched.
pub fn reconcile(
    existing: Option<ShareCountRecord>,
    url: &str,
    fresh: &BTreeMap<ProviderId, u64>,
    now: DateTime<Utc>,
) -> ShareCountRecord {
    let mut rec = existing.unwrap_or_else(|| ShareCountRecord::empty(url));
    for (&provider, &count) in fresh {
        rec.set_slot(provider, ShareCount::fetched(count, now));
    }
    rec
}

/// Owned cache loaded at start of a run and handed to the reconciler.
#[derive(Debug, Default)]
pub struct CacheStore {
    records: HashMap<String, ShareCountRecord>,
    touched: HashSet<String>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from loaded records. Duplicate URLs are rejected.
    pub fn from_records(records: Vec<ShareCountRecord>) -> Result<Self> {
        let mut map = HashMap::with_capacity(records.len());
        for r in records {
            let url = r.url.clone();
            if map.insert(url.clone(), r).is_some() {
                bail!("duplicate cache record for {url}");
            }
        }
        Ok(Self {
            records: map,
            touched: HashSet::new(),
        })
    }

    pub fn from_json(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed == "null" {
            return Ok(Self::new());
        }
        let records: Vec<ShareCountRecord> =
            serde_json::from_str(trimmed).context("parse share-count cache json")?;
        Self::from_records(records)
    }

    /// Load the cache blob. A missing file starts an empty cache.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(s) => {
                let store = Self::from_json(&s)
                    .with_context(|| format!("loading cache from {}", path.display()))?;
                tracing::info!(target: "cache", path = %path.display(), records = store.len(), "cache loaded");
                Ok(store)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(target: "cache", path = %path.display(), "no cache file, starting empty");
                Ok(Self::new())
            }
            Err(e) => Err(e).with_context(|| format!("reading cache from {}", path.display())),
        }
    }

    pub fn get(&self, url: &str) -> Option<&ShareCountRecord> {
        self.records.get(url)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Reconcile `fresh` into the record for `url`. At most once per URL per store.
    pub fn apply(
        &mut self,
        url: &str,
        fresh: &BTreeMap<ProviderId, u64>,
        now: DateTime<Utc>,
    ) -> Result<&ShareCountRecord> {
        if !self.touched.insert(url.to_string()) {
            bail!("cache record for {url} already reconciled in this run");
        }
        let existing = self.records.remove(url);
        let rec = reconcile(existing, url, fresh, now);
        let rec = self.records.entry(url.to_string()).or_insert(rec);
        Ok(&*rec)
    }

    /// All records, sorted by URL descending.
    pub fn into_sorted(self) -> Vec<ShareCountRecord> {
        crate::output::sort_by_url_desc(self.records.into_values().collect())
    }
}

/// Serde adapter mapping the zero timestamp to `None` and back.
mod fetch_at {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const ZERO_TIME: &str = "0001-01-01T00:00:00Z";
    // 0001-01-01T00:00:00Z as unix seconds
    const ZERO_TIME_SECS: i64 = -62_135_596_800;

    pub fn serialize<S: Serializer>(v: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(dt) => s.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            None => s.serialize_str(ZERO_TIME),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        let dt = DateTime::parse_from_rfc3339(&raw)
            .map_err(serde::de::Error::custom)?
            .with_timezone(&Utc);
        if dt.timestamp() <= ZERO_TIME_SECS {
            Ok(None)
        } else {
            Ok(Some(dt))
        }
    }
}
