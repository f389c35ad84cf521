//! Logging setup and metric descriptions.
//!
//! Counters are recorded through the `metrics` facade; without an installed
//! recorder they are no-ops.

use metrics::describe_counter;
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// One-time metrics registration.
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "sharecount_fetch_total",
            "Successful provider fetches, by provider."
        );
        describe_counter!(
            "sharecount_fetch_errors_total",
            "Failed provider fetches, by provider."
        );
        describe_counter!(
            "sharecount_skipped_total",
            "Sitemap URLs not polled this run, by reason."
        );
        describe_counter!("pageview_rows_total", "Raw analytics rows read.");
        describe_counter!(
            "pageview_rows_excluded_total",
            "Rows dropped as non-article traffic."
        );
        describe_counter!(
            "pageview_unattributed_total",
            "Pathless titles that matched no known path."
        );
    });
}

/// Logs go to stderr; stdout carries the JSON result.
/// `RUST_LOG` overrides the default `info` filter, `LOG_FORMAT=json` switches format.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .ok()
        .is_some_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}
