// src/config.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::analytics::ReportRequest;
use crate::staleness::{DisabledProviders, StalenessPolicy, DEFAULT_WINDOW_DAYS};

pub const ENV_CONFIG_PATH: &str = "BLOG_METRICS_CONFIG";

pub const DEFAULT_SITE_ROOT: &str = "https://future-architect.github.io/";
pub const DEFAULT_CACHE_PATH: &str = "sns_count_cache.json";
/// The blog's founding day; pageview totals are all-time.
pub const DEFAULT_START_DATE: &str = "2016-02-16";

/// What a single failed provider fetch does to the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FetchErrorPolicy {
    /// Fail the whole run before anything is written.
    #[default]
    Abort,
    /// Leave that URL's record untouched and continue.
    SkipUrl,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ShareCountConfig {
    pub window_days: i64,
    pub disable: DisabledProviders,
    pub site_root: String,
    pub sitemap_url: Option<String>,
    pub feedly_feed_id: Option<String>,
    pub cache_path: PathBuf,
    pub on_fetch_error: FetchErrorPolicy,
}

impl Default for ShareCountConfig {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            disable: DisabledProviders::none(),
            site_root: DEFAULT_SITE_ROOT.to_string(),
            sitemap_url: None,
            feedly_feed_id: None,
            cache_path: PathBuf::from(DEFAULT_CACHE_PATH),
            on_fetch_error: FetchErrorPolicy::Abort,
        }
    }
}

impl ShareCountConfig {
    pub fn sitemap_url(&self) -> String {
        self.sitemap_url
            .clone()
            .unwrap_or_else(|| format!("{}post-sitemap.xml", self.site_root))
    }

    pub fn feedly_feed_id(&self) -> String {
        self.feedly_feed_id
            .clone()
            .unwrap_or_else(|| format!("feed/{}atom.xml", self.site_root))
    }

    pub fn policy(&self) -> StalenessPolicy {
        StalenessPolicy::new(self.window_days, self.disable.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PageviewConfig {
    pub property_id: String,
    pub start_date: String,
    pub end_date: String,
    pub limit: u32,
    pub report_file: Option<PathBuf>,
}

impl Default for PageviewConfig {
    fn default() -> Self {
        Self {
            property_id: "319098367".to_string(),
            start_date: DEFAULT_START_DATE.to_string(),
            end_date: "today".to_string(),
            limit: 3000,
            report_file: None,
        }
    }
}

impl PageviewConfig {
    pub fn request(&self) -> ReportRequest {
        ReportRequest {
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            limit: self.limit,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub share_count: ShareCountConfig,
    pub pageviews: PageviewConfig,
}

/// Load config from an explicit path. Supports TOML or JSON formats.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_config(&content, ext.as_str())
        .with_context(|| format!("parsing config {}", path.display()))
}

/// Load config using flag/env + fallbacks:
/// 1) `explicit` (the `--config` flag)
/// 2) $BLOG_METRICS_CONFIG
/// 3) config/blog_metrics.toml
/// 4) config/blog_metrics.json
/// 5) built-in defaults
pub fn load_config_default(explicit: Option<&Path>) -> Result<AppConfig> {
    if let Some(p) = explicit {
        return load_config_from(p);
    }
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        } else {
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/blog_metrics.toml");
    if toml_p.exists() {
        return load_config_from(&toml_p);
    }
    let json_p = PathBuf::from("config/blog_metrics.json");
    if json_p.exists() {
        return load_config_from(&json_p);
    }
    Ok(AppConfig::default())
}

fn parse_config(s: &str, hint_ext: &str) -> Result<AppConfig> {
    if hint_ext == "json" {
        return serde_json::from_str(s).context("invalid json config");
    }
    if hint_ext == "toml" {
        return toml::from_str(s).context("invalid toml config");
    }
    // No usable extension: JSON documents start with `{`.
    if s.trim_start().starts_with('{') {
        serde_json::from_str(s).context("invalid json config")
    } else {
        toml::from_str(s).context("invalid toml config")
    }
}
