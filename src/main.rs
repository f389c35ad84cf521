//! blog-metrics CLI entrypoint.
//! Each subcommand prints its JSON result to stdout; logs go to stderr.
//! Persisting stdout (e.g. back into the cache file) is up to the caller.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use blog_metrics::analytics::{AnalyticsSource, Ga4Client, SavedReport};
use blog_metrics::cache::{CacheStore, ProviderId};
use blog_metrics::config::{
    load_config_default, FetchErrorPolicy, PageviewConfig, ShareCountConfig,
};
use blog_metrics::migrate::{build_from_legacy, LegacyMaps};
use blog_metrics::output::render_json;
use blog_metrics::pageviews::run_pageviews;
use blog_metrics::providers::{
    FacebookFetcher, FeedlyFetcher, HatebuFetcher, PocketFetcher, ShareCountFetcher,
};
use blog_metrics::share_count::{refresh_share_counts, RefreshSettings};
use blog_metrics::sitemap::Sitemap;
use blog_metrics::staleness::DisabledProviders;
use blog_metrics::telemetry::init_tracing;

#[derive(Parser, Debug)]
#[clap(name = "blog-metrics")]
#[clap(about = "Refresh the blog's share-count cache and build its pageview ranking")]
struct Cli {
    /// Config file (TOML or JSON); defaults to $BLOG_METRICS_CONFIG or config/blog_metrics.*
    #[clap(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Refresh stale share counts and print the whole cache
    ShareCount(ShareCountArgs),
    /// Print the deduplicated pageview ranking
    Pageviews(PageviewArgs),
    /// Build a cache from the legacy per-provider files
    Migrate(MigrateArgs),
}

#[derive(Args, Debug)]
struct ShareCountArgs {
    /// Disable refresh of these providers, e.g. --disable facebook,hatebu,pocket
    #[clap(long, value_name = "LIST")]
    disable: Option<String>,

    /// Poll articles modified within this many days
    #[clap(long)]
    days: Option<i64>,

    /// Cache file to read (missing file = empty cache)
    #[clap(long, value_name = "FILE")]
    cache: Option<PathBuf>,

    #[clap(long, value_enum)]
    on_fetch_error: Option<FetchErrorPolicy>,
}

#[derive(Args, Debug)]
struct PageviewArgs {
    #[clap(long)]
    start: Option<String>,

    #[clap(long)]
    end: Option<String>,

    #[clap(long)]
    limit: Option<u32>,

    /// Saved runReport JSON to use instead of the live API
    #[clap(long, value_name = "FILE")]
    report_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct MigrateArgs {
    /// Directory holding cache_{facebook,hatebu,pocket,twitter}.json
    #[clap(long, default_value = "resource")]
    resource_dir: PathBuf,
}

fn build_fetchers(
    cfg: &ShareCountConfig,
    client: &reqwest::Client,
) -> Result<Vec<Box<dyn ShareCountFetcher>>> {
    let mut out: Vec<Box<dyn ShareCountFetcher>> = Vec::new();
    let enabled = |p: ProviderId| !cfg.disable.contains(p);

    if enabled(ProviderId::Pocket) {
        out.push(Box::new(PocketFetcher::from_client(client.clone())?));
    }
    if enabled(ProviderId::Hatebu) {
        out.push(Box::new(HatebuFetcher::from_client(client.clone())?));
    }
    if enabled(ProviderId::Facebook) {
        out.push(Box::new(FacebookFetcher::from_env(client.clone())?));
    }
    if enabled(ProviderId::Feedly) {
        out.push(Box::new(FeedlyFetcher::new(
            client.clone(),
            &cfg.feedly_feed_id(),
        )?));
    }
    Ok(out)
}

async fn share_count(mut cfg: ShareCountConfig, args: ShareCountArgs) -> Result<String> {
    if let Some(list) = args.disable.as_deref() {
        cfg.disable = DisabledProviders::parse(list).context("--disable")?;
    }
    if let Some(days) = args.days {
        cfg.window_days = days;
    }
    if let Some(p) = args.cache {
        cfg.cache_path = p;
    }
    if let Some(p) = args.on_fetch_error {
        cfg.on_fetch_error = p;
    }

    let client = reqwest::Client::new();
    let store = CacheStore::load(&cfg.cache_path)?;
    let sitemap = Sitemap::from_url(cfg.sitemap_url(), client.clone());
    let fetchers = build_fetchers(&cfg, &client)?;
    let settings = RefreshSettings {
        policy: cfg.policy(),
        site_root: cfg.site_root.clone(),
        on_fetch_error: cfg.on_fetch_error,
    };

    let (records, _summary) =
        refresh_share_counts(store, &sitemap, &fetchers, &settings, Utc::now()).await?;
    render_json(&records)
}

async fn pageviews(mut cfg: PageviewConfig, args: PageviewArgs) -> Result<String> {
    if let Some(s) = args.start {
        cfg.start_date = s;
    }
    if let Some(e) = args.end {
        cfg.end_date = e;
    }
    if let Some(l) = args.limit {
        cfg.limit = l;
    }
    if let Some(p) = args.report_file {
        cfg.report_file = Some(p);
    }

    let source: Box<dyn AnalyticsSource> = match &cfg.report_file {
        Some(p) => Box::new(SavedReport::load(p)?),
        None => Box::new(Ga4Client::from_env(
            reqwest::Client::new(),
            cfg.property_id.clone(),
        )?),
    };
    let ranking = run_pageviews(source.as_ref(), &cfg.request()).await?;
    render_json(&ranking)
}

fn migrate(args: MigrateArgs) -> Result<String> {
    let maps = LegacyMaps::load(&args.resource_dir)?;
    let records = build_from_legacy(&maps, Utc::now());
    render_json(&records)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev (FB_TOKEN, GA_ACCESS_TOKEN); no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let cfg = load_config_default(cli.config.as_deref())?;

    let out = match cli.command {
        Command::ShareCount(args) => share_count(cfg.share_count, args).await?,
        Command::Pageviews(args) => pageviews(cfg.pageviews, args).await?,
        Command::Migrate(args) => migrate(args)?,
    };

    println!("{out}");
    Ok(())
}
