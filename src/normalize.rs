//! # Normalizer
//! Turns raw analytics rows into [`MetricRecord`]s.
//!
//! - Metric strings are parsed as non-negative integers; anything else is 0.
//! - Values are bucketed up to the next multiple of 100 before any summation.
//! - Trailing `index.html` is stripped from paths.
//! - Taxonomy pages (`/tags/`, `/authors/`, `/categories/`) are dropped.
//! - Rows with an empty path are kept with an empty key so the merge step can
//!   attribute them by title.

use serde::{Deserialize, Serialize};

/// Path prefixes of non-article pages.
pub const EXCLUDED_PREFIXES: [&str; 3] = ["/tags/", "/authors/", "/categories/"];

const INDEX_HTML: &str = "index.html";

/// One normalized analytics row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricRecord {
    /// Canonical path. May be empty after stripping (`index.html` alone).
    pub key: String,
    pub title: String,
    pub value: u64,
    /// The source row carried no path at all.
    #[serde(default)]
    pub pathless: bool,
}

impl MetricRecord {
    pub fn has_path(&self) -> bool {
        !self.pathless
    }
}

/// `ceil(v / 100) * 100`.
pub fn round_up_100(v: u64) -> u64 {
    v.div_ceil(100).saturating_mul(100)
}

/// Parse a metric cell. Malformed or negative input degrades to 0.
pub fn parse_metric(raw: &str) -> u64 {
    raw.trim().parse::<u64>().unwrap_or(0)
}

pub fn strip_index_html(path: &str) -> &str {
    let mut p = path;
    while let Some(rest) = p.strip_suffix(INDEX_HTML) {
        p = rest;
    }
    p
}

pub fn is_excluded_path(path: &str) -> bool {
    EXCLUDED_PREFIXES.iter().any(|pre| path.starts_with(pre))
}

/// Normalize one raw `(path, title, metric)` triple.
/// Returns `None` when the row is non-article traffic.
pub fn normalize_row(raw_path: &str, raw_title: &str, raw_metric: &str) -> Option<MetricRecord> {
    let value = round_up_100(parse_metric(raw_metric));

    if raw_path.is_empty() {
        return Some(MetricRecord {
            key: String::new(),
            title: raw_title.to_string(),
            value,
            pathless: true,
        });
    }

    if is_excluded_path(raw_path) {
        return None;
    }

    Some(MetricRecord {
        key: strip_index_html(raw_path).to_string(),
        title: raw_title.to_string(),
        value,
        pathless: false,
    })
}
