//! # Merge Engine
//! Folds normalized pageview rows into one aggregate per canonical path.
//!
//! Three stages, each producing a fresh keyed map:
//! 1. title pass: rows with a path are summed per title; pathless rows go to a
//!    side table keyed by title.
//! 2. reconciliation: side-table values are added to the title aggregate of the
//!    same title; titles with no such aggregate are unattributable and dropped.
//! 3. path pass: title aggregates sharing a path (renamed articles) are summed.
//!
//! The resulting `(path, pv)` pairs do not depend on input order. When one title
//! appears under several paths, the lexicographically smallest path wins.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::normalize::MetricRecord;
use crate::output::UrlKeyed;

/// Deduplicated pageview total for one canonical path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageviewAggregate {
    pub path: String,
    pub pv: u64,
    pub title: String,
}

impl UrlKeyed for PageviewAggregate {
    fn url_key(&self) -> &str {
        &self.path
    }
}

/// Result of one merge, with the accepted data loss made visible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Aggregates ordered by path ascending.
    pub aggregates: Vec<PageviewAggregate>,
    /// Titles of pathless rows that matched no known path.
    pub unattributed_titles: Vec<String>,
    pub unattributed_pv: u64,
}

impl MergeReport {
    pub fn total_pv(&self) -> u64 {
        self.aggregates.iter().map(|a| a.pv).sum()
    }
}

struct TitlePass {
    by_title: BTreeMap<String, PageviewAggregate>,
    pathless: BTreeMap<String, u64>,
}

fn title_pass(records: impl IntoIterator<Item = MetricRecord>) -> TitlePass {
    let mut by_title: BTreeMap<String, PageviewAggregate> = BTreeMap::new();
    let mut pathless: BTreeMap<String, u64> = BTreeMap::new();

    for rec in records {
        if !rec.has_path() {
            let slot = pathless.entry(rec.title).or_default();
            *slot = slot.saturating_add(rec.value);
            continue;
        }
        match by_title.get_mut(&rec.title) {
            Some(agg) => {
                agg.pv = agg.pv.saturating_add(rec.value);
                if rec.key < agg.path {
                    agg.path = rec.key;
                }
            }
            None => {
                by_title.insert(
                    rec.title.clone(),
                    PageviewAggregate {
                        path: rec.key,
                        pv: rec.value,
                        title: rec.title,
                    },
                );
            }
        }
    }

    TitlePass { by_title, pathless }
}

fn attribute_pathless(
    pass: TitlePass,
) -> (BTreeMap<String, PageviewAggregate>, Vec<String>, u64) {
    let TitlePass { by_title, pathless } = pass;

    let mut unattributed = Vec::new();
    let mut lost_pv = 0u64;
    for (title, pv) in &pathless {
        if !by_title.contains_key(title) {
            unattributed.push(title.clone());
            lost_pv = lost_pv.saturating_add(*pv);
        }
    }

    let attributed = by_title
        .into_iter()
        .map(|(title, mut agg)| {
            if let Some(extra) = pathless.get(&title) {
                agg.pv = agg.pv.saturating_add(*extra);
            }
            (title, agg)
        })
        .collect();

    (attributed, unattributed, lost_pv)
}

fn path_pass(by_title: BTreeMap<String, PageviewAggregate>) -> BTreeMap<String, PageviewAggregate> {
    let mut by_path: BTreeMap<String, PageviewAggregate> = BTreeMap::new();
    for agg in by_title.into_values() {
        match by_path.get_mut(&agg.path) {
            Some(acc) => {
                acc.pv = acc.pv.saturating_add(agg.pv);
                // cosmetic only; last title in title order wins
                acc.title = agg.title;
            }
            None => {
                by_path.insert(agg.path.clone(), agg);
            }
        }
    }
    by_path
}

/// Merge one query's normalized rows into per-path aggregates.
pub fn merge_pageviews(records: impl IntoIterator<Item = MetricRecord>) -> MergeReport {
    let pass = title_pass(records);
    let (attributed, unattributed_titles, unattributed_pv) = attribute_pathless(pass);
    let by_path = path_pass(attributed);

    MergeReport {
        aggregates: by_path.into_values().collect(),
        unattributed_titles,
        unattributed_pv,
    }
}
