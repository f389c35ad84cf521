// src/lib.rs
// Public library surface for the binary and integration tests.

// Core engine
pub mod cache;
pub mod merge;
pub mod normalize;
pub mod output;
pub mod staleness;

// Runs
pub mod migrate;
pub mod pageviews;
pub mod share_count;

// Collaborators (HTTP / files)
pub mod analytics;
pub mod providers;
pub mod sitemap;

pub mod config;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::cache::{reconcile, CacheStore, ProviderId, ShareCount, ShareCountRecord};
pub use crate::merge::{merge_pageviews, PageviewAggregate};
pub use crate::normalize::{normalize_row, round_up_100, strip_index_html, MetricRecord};
pub use crate::staleness::{should_refresh, DisabledProviders, StalenessPolicy};
