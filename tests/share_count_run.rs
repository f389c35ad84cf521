// tests/share_count_run.rs
use anyhow::{bail, Result};
use async_trait::async_trait;
use blog_metrics::cache::{CacheStore, ProviderId, ShareCount, ShareCountRecord};
use blog_metrics::config::FetchErrorPolicy;
use blog_metrics::providers::ShareCountFetcher;
use blog_metrics::share_count::{refresh_share_counts, RefreshSettings};
use blog_metrics::sitemap::Sitemap;
use blog_metrics::staleness::{DisabledProviders, StalenessPolicy};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::{Arc, Mutex};

const ROOT: &str = "https://blog.example/";
const FRESH_ARTICLE: &str = "https://blog.example/articles/20240225/";
const OLD_ARTICLE: &str = "https://blog.example/articles/20240110/";

type Calls = Arc<Mutex<Vec<String>>>;

struct MockFetcher {
    provider: ProviderId,
    count: u64,
    fail_on: Option<&'static str>,
    calls: Calls,
}

impl MockFetcher {
    fn boxed(provider: ProviderId, count: u64) -> (Box<dyn ShareCountFetcher>, Calls) {
        Self::failing(provider, count, None)
    }

    fn failing(
        provider: ProviderId,
        count: u64,
        fail_on: Option<&'static str>,
    ) -> (Box<dyn ShareCountFetcher>, Calls) {
        let calls: Calls = Arc::default();
        let f = MockFetcher {
            provider,
            count,
            fail_on,
            calls: calls.clone(),
        };
        (Box::new(f), calls)
    }
}

#[async_trait]
impl ShareCountFetcher for MockFetcher {
    fn provider(&self) -> ProviderId {
        self.provider
    }

    async fn fetch(&self, url: &str) -> Result<u64> {
        self.calls.lock().unwrap().push(url.to_string());
        if self.fail_on == Some(url) {
            bail!("503 from {}", self.provider);
        }
        Ok(self.count)
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
}

fn sitemap() -> Sitemap {
    let xml = std::fs::read_to_string("tests/fixtures/post-sitemap.xml")
        .expect("missing tests/fixtures/post-sitemap.xml");
    Sitemap::from_fixture_str(&xml)
}

fn settings(disabled: DisabledProviders, on_fetch_error: FetchErrorPolicy) -> RefreshSettings {
    RefreshSettings {
        policy: StalenessPolicy::new(14, disabled),
        site_root: ROOT.to_string(),
        on_fetch_error,
    }
}

fn default_settings() -> RefreshSettings {
    settings(DisabledProviders::none(), FetchErrorPolicy::Abort)
}

#[tokio::test]
async fn first_run_creates_fresh_articles_and_root_only() {
    let (pocket, pocket_calls) = MockFetcher::boxed(ProviderId::Pocket, 2);
    let (hatebu, _) = MockFetcher::boxed(ProviderId::Hatebu, 5);
    let (facebook, _) = MockFetcher::boxed(ProviderId::Facebook, 1);
    let (feedly, feedly_calls) = MockFetcher::boxed(ProviderId::Feedly, 800);
    let fetchers = vec![pocket, hatebu, facebook, feedly];

    let (records, summary) = refresh_share_counts(
        CacheStore::new(),
        &sitemap(),
        &fetchers,
        &default_settings(),
        now(),
    )
    .await
    .unwrap();

    let urls: Vec<&str> = records.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(urls, vec![FRESH_ARTICLE, ROOT]);

    let article = &records[0];
    assert_eq!(article.pocket, ShareCount::fetched(2, now()));
    assert_eq!(article.hatebu, ShareCount::fetched(5, now()));
    assert_eq!(article.facebook, ShareCount::fetched(1, now()));
    assert_eq!(article.twitter, ShareCount::default());
    assert_eq!(article.feedly, None);

    let root = &records[1];
    assert_eq!(root.feedly, Some(ShareCount::fetched(800, now())));
    assert_eq!(root.hatebu.fetched_at, None);

    assert_eq!(*feedly_calls.lock().unwrap(), vec![ROOT.to_string()]);
    assert_eq!(*pocket_calls.lock().unwrap(), vec![FRESH_ARTICLE.to_string()]);
    assert_eq!(summary.frozen, 2);
    assert_eq!(summary.reconciled, 2);
    assert_eq!(summary.fetches, 4);
}

#[tokio::test]
async fn frozen_and_unlisted_records_pass_through_unchanged() {
    let long_ago = Utc.with_ymd_and_hms(2024, 1, 11, 0, 0, 0).unwrap();
    let mut frozen = ShareCountRecord::empty(OLD_ARTICLE);
    frozen.hatebu = ShareCount::fetched(40, long_ago);
    let mut unlisted = ShareCountRecord::empty("https://blog.example/articles/2016/removed/");
    unlisted.facebook = ShareCount::fetched(3, long_ago);
    let store = CacheStore::from_records(vec![frozen.clone(), unlisted.clone()]).unwrap();

    let (hatebu, hatebu_calls) = MockFetcher::boxed(ProviderId::Hatebu, 99);
    let (records, _) = refresh_share_counts(
        store,
        &sitemap(),
        &[hatebu],
        &default_settings(),
        now(),
    )
    .await
    .unwrap();

    assert!(records.contains(&frozen));
    assert!(records.contains(&unlisted));
    assert_eq!(*hatebu_calls.lock().unwrap(), vec![FRESH_ARTICLE.to_string()]);

    let mut sorted: Vec<String> = records.iter().map(|r| r.url.clone()).collect();
    sorted.sort_by(|a, b| b.cmp(a));
    let got: Vec<String> = records.iter().map(|r| r.url.clone()).collect();
    assert_eq!(got, sorted);
}

#[tokio::test]
async fn recently_fetched_slots_are_not_refetched() {
    let just_now = now() - Duration::seconds(30);
    let mut rec = ShareCountRecord::empty(FRESH_ARTICLE);
    rec.pocket = ShareCount::fetched(11, just_now);
    rec.hatebu = ShareCount::fetched(12, now() - Duration::minutes(5));
    let store = CacheStore::from_records(vec![rec]).unwrap();

    let (pocket, pocket_calls) = MockFetcher::boxed(ProviderId::Pocket, 50);
    let (hatebu, hatebu_calls) = MockFetcher::boxed(ProviderId::Hatebu, 60);
    let (records, _) = refresh_share_counts(
        store,
        &sitemap(),
        &[pocket, hatebu],
        &default_settings(),
        now(),
    )
    .await
    .unwrap();

    assert!(pocket_calls.lock().unwrap().is_empty());
    assert_eq!(hatebu_calls.lock().unwrap().len(), 1);

    let article = records.iter().find(|r| r.url == FRESH_ARTICLE).unwrap();
    assert_eq!(article.pocket, ShareCount::fetched(11, just_now));
    assert_eq!(article.hatebu, ShareCount::fetched(60, now()));
}

#[tokio::test]
async fn disabled_provider_is_skipped_even_with_a_fetcher() {
    let (pocket, pocket_calls) = MockFetcher::boxed(ProviderId::Pocket, 1);
    let (feedly, feedly_calls) = MockFetcher::boxed(ProviderId::Feedly, 1);
    let disabled = DisabledProviders::parse("pocket,feedly").unwrap();

    let (records, _) = refresh_share_counts(
        CacheStore::new(),
        &sitemap(),
        &[pocket, feedly],
        &settings(disabled, FetchErrorPolicy::Abort),
        now(),
    )
    .await
    .unwrap();

    assert!(pocket_calls.lock().unwrap().is_empty());
    assert!(feedly_calls.lock().unwrap().is_empty());
    // in-window article is still recorded, with untouched zero slots
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].url, FRESH_ARTICLE);
    assert_eq!(records[0].pocket.fetched_at, None);
}

#[tokio::test]
async fn fetch_failure_aborts_the_run_by_default() {
    let (hatebu, _) = MockFetcher::failing(ProviderId::Hatebu, 1, Some(FRESH_ARTICLE));
    let err = refresh_share_counts(
        CacheStore::new(),
        &sitemap(),
        &[hatebu],
        &default_settings(),
        now(),
    )
    .await
    .unwrap_err();

    let msg = format!("{err:#}");
    assert!(msg.contains("hatebu fetch for"), "{msg}");
    assert!(msg.contains("503"), "{msg}");
}

#[tokio::test]
async fn skip_url_policy_leaves_failed_url_untouched() {
    let mut rec = ShareCountRecord::empty(FRESH_ARTICLE);
    rec.pocket = ShareCount::fetched(7, now() - Duration::days(1));
    let store = CacheStore::from_records(vec![rec.clone()]).unwrap();

    let (pocket, _) = MockFetcher::boxed(ProviderId::Pocket, 100);
    let (hatebu, _) = MockFetcher::failing(ProviderId::Hatebu, 1, Some(FRESH_ARTICLE));
    let (feedly, _) = MockFetcher::boxed(ProviderId::Feedly, 5);

    let (records, summary) = refresh_share_counts(
        store,
        &sitemap(),
        &[pocket, hatebu, feedly],
        &settings(DisabledProviders::none(), FetchErrorPolicy::SkipUrl),
        now(),
    )
    .await
    .unwrap();

    assert_eq!(summary.failed_urls, vec![FRESH_ARTICLE.to_string()]);
    let article = records.iter().find(|r| r.url == FRESH_ARTICLE).unwrap();
    assert_eq!(article, &rec);
    let root = records.iter().find(|r| r.url == ROOT).unwrap();
    assert_eq!(root.feedly, Some(ShareCount::fetched(5, now())));
}

#[tokio::test]
async fn two_fetchers_for_one_provider_is_a_config_error() {
    let (a, _) = MockFetcher::boxed(ProviderId::Pocket, 1);
    let (b, _) = MockFetcher::boxed(ProviderId::Pocket, 2);
    let res = refresh_share_counts(
        CacheStore::new(),
        &sitemap(),
        &[a, b],
        &default_settings(),
        now(),
    )
    .await;
    assert!(res.is_err());
}

#[tokio::test]
async fn duplicate_sitemap_entries_reconcile_once() {
    let xml = format!(
        r#"<urlset><url><loc>{FRESH_ARTICLE}</loc><lastmod>2024-02-28</lastmod></url><url><loc>{FRESH_ARTICLE}</loc><lastmod>2024-02-28</lastmod></url></urlset>"#
    );
    let (pocket, calls) = MockFetcher::boxed(ProviderId::Pocket, 4);
    let (records, summary) = refresh_share_counts(
        CacheStore::new(),
        &Sitemap::from_fixture_str(&xml),
        &[pocket],
        &default_settings(),
        now(),
    )
    .await
    .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(calls.lock().unwrap().len(), 1);
    assert_eq!(summary.duplicates, 1);
}
