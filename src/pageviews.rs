//! Pageview ranking run: report rows -> normalize -> merge -> ordered output.

use anyhow::Result;
use metrics::counter;
use serde::Serialize;

use crate::analytics::{AnalyticsSource, RawRow, ReportRequest};
use crate::merge::{merge_pageviews, PageviewAggregate};
use crate::normalize::normalize_row;
use crate::output::sort_by_url_desc;
use crate::telemetry::ensure_metrics_described;

/// Serialized result: `{"pv": [{"path", "pv", "title"}, ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageviewRanking {
    pub pv: Vec<PageviewAggregate>,
}

/// Normalize and merge raw rows. Pure; no I/O.
pub fn build_ranking(rows: &[RawRow]) -> PageviewRanking {
    ensure_metrics_described();

    let mut excluded = 0u64;
    let records: Vec<_> = rows
        .iter()
        .filter_map(|r| {
            let rec = normalize_row(r.path(), r.title(), r.pageviews());
            if rec.is_none() {
                excluded += 1;
            }
            rec
        })
        .collect();

    let report = merge_pageviews(records);

    counter!("pageview_rows_total").increment(rows.len() as u64);
    counter!("pageview_rows_excluded_total").increment(excluded);
    counter!("pageview_unattributed_total").increment(report.unattributed_titles.len() as u64);

    if !report.unattributed_titles.is_empty() {
        tracing::info!(
            target: "pageviews",
            titles = report.unattributed_titles.len(),
            pv = report.unattributed_pv,
            "pathless rows with no matching title dropped"
        );
    }
    tracing::debug!(target: "pageviews", rows = rows.len(), excluded, paths = report.aggregates.len(), "merged");

    PageviewRanking {
        pv: sort_by_url_desc(report.aggregates),
    }
}

pub async fn run_pageviews(
    source: &dyn AnalyticsSource,
    req: &ReportRequest,
) -> Result<PageviewRanking> {
    let rows = source.run_report(req).await?;
    Ok(build_ranking(&rows))
}
